/// Can be used while indexing keys without values, like ``Llrb<K, Empty>``,
/// turning the table into a sorted set.
#[derive(Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
pub struct Empty {}
