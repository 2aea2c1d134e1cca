/*!
Integer handles replacing the raw back-pointers of the original
implementation. `DeviceId`/`PortId`/`VlinkId` are the identifiers
already carried by the input configuration; `VnodeId`/`DelayTaskId`/
`QrtaId` are arena indices assigned while building the [`Network`](crate::topology::Network).
*/

use std::fmt;

macro_rules! newtype_id
{
	($name:ident, $inner:ty) => {
		#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
		pub struct $name(pub $inner);

		impl fmt::Display for $name
		{
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
			{
				write!(f, "{}", self.0)
			}
		}
	};
}

newtype_id!(DeviceId, i32);
newtype_id!(PortId, i32);
newtype_id!(VlinkId, i32);
newtype_id!(VnodeId, usize);
newtype_id!(DelayTaskId, usize);
newtype_id!(QrtaId, usize);

/// Which scheduling element of a switch a [`DelayTask`](crate::task::DelayTask) represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElemKind
{
	/// The switching fabric, contended by an independent component of the CIOQ traffic graph.
	F,
	/// An output port, contended by every VL leaving through it.
	P,
}

impl fmt::Display for ElemKind
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		match self
		{
			ElemKind::F => write!(f, "F"),
			ElemKind::P => write!(f, "P"),
		}
	}
}

/// A branch key identifying one contributor (or successor) of a [`DelayTask`](crate::task::DelayTask):
/// the VL, and the ingress port id of the next hop along that VL's path through the element.
pub type Branch = (VlinkId, PortId);
