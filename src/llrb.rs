use std::{
    borrow::Borrow,
    cmp::{self, Ord, Ordering},
    collections::VecDeque,
    mem,
    ops::{Bound, Deref, DerefMut, RangeBounds},
};

use log::{debug, error, warn};
use rand::Rng;

use crate::depth::Depth;
use crate::error::Error;

/// Default number of entries fetched from the tree per batch, while
/// iterating. Refer [`Llrb::set_iter_limit`].
const ITER_LIMIT: usize = 100;

/// Llrb manage a single instance of in-memory ordered symbol table using
/// [left-leaning-red-black][llrb] tree. Every node tracks the size of its
/// sub-tree, which makes order-statistic queries, [`rank`] and [`select`],
/// logarithmic.
///
/// [llrb]: https://en.wikipedia.org/wiki/Left-leaning_red-black_tree
/// [`rank`]: Llrb::rank
/// [`select`]: Llrb::select
#[derive(Clone)]
pub struct Llrb<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    name: String,
    root: Option<Box<Node<K, V>>>,
    iter_limit: usize,
}

/// Different ways to construct a new Llrb instance.
impl<K, V> Llrb<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Create an empty instance of Llrb, identified by `name`.
    /// Applications can choose unique names.
    pub fn new<S>(name: S) -> Llrb<K, V>
    where
        S: AsRef<str>,
    {
        Llrb {
            name: name.as_ref().to_string(),
            root: Default::default(),
            iter_limit: ITER_LIMIT,
        }
    }

    /// Create a new instance of Llrb tree and load it with entries
    /// from `iter`. Note that iterator should return (key, value) tuples,
    /// where key must be ``unique``, else [`Error::OverwriteKey`].
    pub fn load_from<S, I>(name: S, iter: I) -> Result<Llrb<K, V>, Error<K>>
    where
        S: AsRef<str>,
        I: Iterator<Item = (K, V)>,
    {
        let mut llrb = Llrb::new(name);
        for (key, value) in iter {
            llrb.create(key, value)?;
        }
        debug!("llrb {}: loaded {} entries", llrb.name, llrb.len());
        Ok(llrb)
    }

    /// Number of entries to fetch from the tree per batch, while iterating
    /// with [`iter`] or [`range`]. Minimum is 1.
    ///
    /// [`iter`]: Llrb::iter
    /// [`range`]: Llrb::range
    pub fn set_iter_limit(&mut self, limit: usize) -> &mut Self {
        self.iter_limit = cmp::max(1, limit);
        self
    }
}

/// Maintenance API.
impl<K, V> Llrb<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Identify this instance. Applications can choose unique names while
    /// creating Llrb instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        size(self.root.as_ref().map(Deref::deref))
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Return the number of links on the longest path from root to a
    /// nil-link. Return -1 for empty tree.
    pub fn height(&self) -> isize {
        height(self.root.as_ref().map(Deref::deref))
    }

    /// Return quickly with basic statisics, only entries() method is valid
    /// with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.len(), mem::size_of::<Node<K, V>>())
    }
}

type Upsert<K, V> = (Box<Node<K, V>>, Option<V>);

type Delete<K, V> = (Option<Box<Node<K, V>>>, Option<V>);

type Delmin<K, V> = (Option<Box<Node<K, V>>>, Option<Box<Node<K, V>>>);

/// Write operations on Llrb instance.
impl<K, V> Llrb<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Create a new {key, value} entry in the index. If key is already
    /// present return error, leaving the index untouched.
    pub fn create(&mut self, key: K, value: V) -> Result<(), Error<K>> {
        if self.contains(&key) {
            debug!("llrb {}: create() on existing key", self.name);
            return Err(Error::OverwriteKey);
        }
        self.put(key, value);
        Ok(())
    }

    /// Set value for key. If there is an existing entry for key,
    /// overwrite the old value with new value and return the old value.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let (mut root, old_value) = Llrb::upsert(self.root.take(), key, value);
        root.set_black();
        self.root = Some(root);
        old_value
    }

    /// Delete key from this instance and return its value. If key is
    /// not present, then delete is effectively a no-op.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if !self.contains(key) {
            return None;
        }

        let mut root = self.root.take()?;
        if !is_red(root.left_deref()) && !is_red(root.right_deref()) {
            root.set_red();
        }
        let (root, old_value) = Llrb::do_delete(root, key);
        self.root = root.map(|mut root| {
            root.set_black();
            root
        });
        old_value
    }

    /// Delete the entry with the smallest key and return it.
    pub fn delete_min(&mut self) -> Result<(K, V), Error<K>> {
        let mut root = self.root.take().ok_or(Error::EmptyTable)?;
        if !is_red(root.left_deref()) && !is_red(root.right_deref()) {
            root.set_red();
        }
        let (root, old_node) = Llrb::remove_min(root);
        self.root = root.map(|mut root| {
            root.set_black();
            root
        });
        let old_node = old_node.ok_or(Error::EmptyTable)?;
        Ok((old_node.key, old_node.value))
    }

    /// Delete the entry with the largest key and return it.
    pub fn delete_max(&mut self) -> Result<(K, V), Error<K>> {
        let mut root = self.root.take().ok_or(Error::EmptyTable)?;
        if !is_red(root.left_deref()) && !is_red(root.right_deref()) {
            root.set_red();
        }
        let (root, old_node) = Llrb::remove_max(root);
        self.root = root.map(|mut root| {
            root.set_black();
            root
        });
        let old_node = old_node.ok_or(Error::EmptyTable)?;
        Ok((old_node.key, old_node.value))
    }

    /// Validate LLRB tree with following rules:
    ///
    /// * Root is black and, from root to any leaf, no consecutive reds
    ///   allowed in its path.
    /// * Red links lean left.
    /// * Number of blacks should be same under left child and right child.
    /// * Make sure keys are in sorted order, with respect to every ancestor.
    /// * Sub-tree size of every node is one more than the sum of its
    ///   children's.
    /// * `rank(select(i)) == i` for every position and
    ///   `select(rank(key)) == key` for every key.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats, Error<K>> {
        let root = self.root.as_ref().map(Deref::deref);
        let (red, nb, d) = (is_red(root), 0, 0);
        let mut stats = Stats::new(self.len(), mem::size_of::<Node<K, V>>());
        stats.set_depths(Depth::new());

        let res = Llrb::validate_tree(root, red, nb, d, (None, None), &mut stats)
            .and_then(|blacks| self.validate_ranks().map(|_| blacks));
        match res {
            Ok(blacks) => {
                stats.set_blacks(blacks);
                Ok(stats)
            }
            Err(err) => {
                error!("llrb {}: invariant broken, {} entries", self.name, self.len());
                Err(err)
            }
        }
    }
}

/// Read operations on Llrb instance.
impl<K, V> Llrb<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Get the value for key.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_node(key).map(|node| node.value.clone())
    }

    /// Check whether key is present in this index.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_node(key).is_some()
    }

    /// Return the smallest key.
    pub fn min(&self) -> Result<K, Error<K>> {
        let mut node = self.root.as_ref().map(Deref::deref).ok_or(Error::EmptyTable)?;
        while let Some(left) = node.left_deref() {
            node = left;
        }
        Ok(node.key.clone())
    }

    /// Return the largest key.
    pub fn max(&self) -> Result<K, Error<K>> {
        let mut node = self.root.as_ref().map(Deref::deref).ok_or(Error::EmptyTable)?;
        while let Some(right) = node.right_deref() {
            node = right;
        }
        Ok(node.key.clone())
    }

    /// Return the largest key less than or equal to `key`.
    pub fn floor<Q>(&self, key: &Q) -> Result<K, Error<K>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root.as_ref().map(Deref::deref);
        if node.is_none() {
            return Err(Error::EmptyTable);
        }

        let mut best: Option<&Node<K, V>> = None;
        while let Some(nref) = node {
            node = match nref.key.borrow().cmp(key) {
                Ordering::Greater => nref.left_deref(),
                Ordering::Less => {
                    best = Some(nref);
                    nref.right_deref()
                }
                Ordering::Equal => return Ok(nref.key.clone()),
            };
        }
        match best {
            Some(nref) => Ok(nref.key.clone()),
            None => Err(Error::NotFound("floor(), key is too small".to_string())),
        }
    }

    /// Return the smallest key greater than or equal to `key`.
    pub fn ceiling<Q>(&self, key: &Q) -> Result<K, Error<K>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root.as_ref().map(Deref::deref);
        if node.is_none() {
            return Err(Error::EmptyTable);
        }

        let mut best: Option<&Node<K, V>> = None;
        while let Some(nref) = node {
            node = match nref.key.borrow().cmp(key) {
                Ordering::Less => nref.right_deref(),
                Ordering::Greater => {
                    best = Some(nref);
                    nref.left_deref()
                }
                Ordering::Equal => return Ok(nref.key.clone()),
            };
        }
        match best {
            Some(nref) => Ok(nref.key.clone()),
            None => Err(Error::NotFound("ceiling(), key is too large".to_string())),
        }
    }

    /// Return the number of keys strictly less than `key`.
    pub fn rank<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (mut node, mut rank) = (self.root.as_ref().map(Deref::deref), 0);
        while let Some(nref) = node {
            node = match nref.key.borrow().cmp(key) {
                Ordering::Greater => nref.left_deref(),
                Ordering::Less => {
                    rank += 1 + size(nref.left_deref());
                    nref.right_deref()
                }
                Ordering::Equal => return rank + size(nref.left_deref()),
            };
        }
        rank
    }

    /// Return the key at 0-based position `rank` in sort order. `rank`
    /// must be within `[0, len())`.
    pub fn select(&self, rank: usize) -> Result<K, Error<K>> {
        match self.select_node(rank) {
            Some(node) => Ok(node.key.clone()),
            None => {
                warn!("llrb {}: select() invalid rank {}", self.name, rank);
                let msg = format!("select(), rank {} not in [0, {})", rank, self.len());
                Err(Error::InvalidArgument(msg))
            }
        }
    }

    /// Return the number of keys between `low` and `high`, both inclusive.
    pub fn count_range<Q>(&self, low: &Q, high: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if low.gt(high) {
            return 0;
        }
        let n = self.rank(high) - self.rank(low);
        if self.contains(high) {
            n + 1
        } else {
            n
        }
    }

    /// Return all keys in sort order.
    pub fn keys(&self) -> Vec<K> {
        let mut acc = Vec::with_capacity(self.len());
        Llrb::collect_keys(self.root.as_ref().map(Deref::deref), &mut acc);
        acc
    }

    /// Return keys between `low` and `high`, both inclusive, in sort order.
    pub fn keys_between<Q>(&self, low: &Q, high: &Q) -> Vec<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut acc = vec![];
        let root = self.root.as_ref().map(Deref::deref);
        Llrb::collect_range(root, low, high, &mut acc);
        acc
    }

    /// Return keys in breadth-first order, root first and then level by
    /// level, left to right.
    pub fn level_order(&self) -> Vec<K> {
        let mut acc = Vec::with_capacity(self.len());
        let mut queue: VecDeque<&Node<K, V>> = VecDeque::new();
        queue.extend(self.root.as_ref().map(Deref::deref));
        while let Some(node) = queue.pop_front() {
            acc.push(node.key.clone());
            queue.extend(node.left_deref());
            queue.extend(node.right_deref());
        }
        acc
    }

    /// Return a random entry from this index, every entry is equally
    /// likely to be picked.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<(K, V)> {
        if self.is_empty() {
            return None;
        }
        let node = self.select_node(rng.gen_range(0..self.len()))?;
        Some((node.key.clone(), node.value.clone()))
    }

    /// Return an iterator over all entries in this instance.
    pub fn iter(&self) -> Range<K, V> {
        Range {
            root: self.root.as_ref().map(Deref::deref),
            node_iter: vec![].into_iter(),
            low: Some(Bound::Unbounded),
            high: Bound::Unbounded,
            limit: self.iter_limit,
        }
    }

    /// Range over all entries from low to high.
    pub fn range<Q, R>(&self, range: R) -> Range<K, V>
    where
        K: Borrow<Q>,
        R: RangeBounds<Q>,
        Q: Ord + ToOwned<Owned = K> + ?Sized,
    {
        let low: Bound<K> = match range.start_bound() {
            Bound::Included(key) => Bound::Included(key.to_owned()),
            Bound::Excluded(key) => Bound::Excluded(key.to_owned()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let high: Bound<K> = match range.end_bound() {
            Bound::Included(key) => Bound::Included(key.to_owned()),
            Bound::Excluded(key) => Bound::Excluded(key.to_owned()),
            Bound::Unbounded => Bound::Unbounded,
        };

        Range {
            root: self.root.as_ref().map(Deref::deref),
            node_iter: vec![].into_iter(),
            low: Some(low),
            high,
            limit: self.iter_limit,
        }
    }

    fn get_node<Q>(&self, key: &Q) -> Option<&Node<K, V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root.as_ref().map(Deref::deref);
        while let Some(nref) = node {
            node = match nref.key.borrow().cmp(key) {
                Ordering::Less => nref.right_deref(),
                Ordering::Greater => nref.left_deref(),
                Ordering::Equal => return Some(nref),
            };
        }
        None
    }

    fn select_node(&self, mut rank: usize) -> Option<&Node<K, V>> {
        let mut node = self.root.as_ref().map(Deref::deref);
        while let Some(nref) = node {
            let left_size = size(nref.left_deref());
            node = match left_size.cmp(&rank) {
                Ordering::Greater => nref.left_deref(),
                Ordering::Less => {
                    rank -= left_size + 1;
                    nref.right_deref()
                }
                Ordering::Equal => return Some(nref),
            };
        }
        None
    }

    fn collect_keys(node: Option<&Node<K, V>>, acc: &mut Vec<K>) {
        if let Some(node) = node {
            Llrb::collect_keys(node.left_deref(), acc);
            acc.push(node.key.clone());
            Llrb::collect_keys(node.right_deref(), acc);
        }
    }

    fn collect_range<Q>(node: Option<&Node<K, V>>, low: &Q, high: &Q, acc: &mut Vec<K>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = match node {
            Some(node) => node,
            None => return,
        };

        let key: &Q = node.key.borrow();
        let (low_le, high_ge) = (low.le(key), high.ge(key));
        if low_le {
            Llrb::collect_range(node.left_deref(), low, high, acc);
        }
        if low_le && high_ge {
            acc.push(node.key.clone());
        }
        if high_ge {
            Llrb::collect_range(node.right_deref(), low, high, acc);
        }
    }
}

impl<K, V> Llrb<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    fn upsert(node: Option<Box<Node<K, V>>>, key: K, value: V) -> Upsert<K, V> {
        let mut node = match node {
            None => return (Node::new(key, value, false /*black*/), None),
            Some(node) => node,
        };

        match node.key.cmp(&key) {
            Ordering::Greater => {
                let (left, o) = Llrb::upsert(node.left.take(), key, value);
                node.left = Some(left);
                (Llrb::walkuprot_23(node), o)
            }
            Ordering::Less => {
                let (right, o) = Llrb::upsert(node.right.take(), key, value);
                node.right = Some(right);
                (Llrb::walkuprot_23(node), o)
            }
            Ordering::Equal => {
                let old_value = mem::replace(&mut node.value, value);
                (Llrb::walkuprot_23(node), Some(old_value))
            }
        }
    }

    // key must be present in the sub-tree.
    fn do_delete<Q>(mut node: Box<Node<K, V>>, key: &Q) -> Delete<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if node.key.borrow().gt(key) {
            if node.left.is_none() {
                return (Some(node), None);
            }
            if !is_red(node.left_deref()) && !node.is_red_left_left() {
                node = Llrb::move_red_left(node);
            }
            let (left, old_value) = match node.left.take() {
                Some(left) => Llrb::do_delete(left, key),
                None => (None, None),
            };
            node.left = left;
            return (Some(Llrb::fixup(node)), old_value);
        }

        if is_red(node.left_deref()) {
            node = Llrb::rotate_right(node);
        }

        if node.key.borrow().eq(key) && node.right.is_none() {
            return (None, Some(node.value));
        }

        if node.right.is_some() && !is_red(node.right_deref()) && !node.is_red_right_left() {
            node = Llrb::move_red_right(node);
        }

        if node.key.borrow().eq(key) {
            // replace with the smallest entry from right sub-tree.
            let (right, min_node) = match node.right.take() {
                Some(right) => Llrb::remove_min(right),
                None => (None, None),
            };
            node.right = right;
            let old_value = min_node.map(|min_node| {
                let min_node = *min_node;
                node.key = min_node.key;
                mem::replace(&mut node.value, min_node.value)
            });
            (Some(Llrb::fixup(node)), old_value)
        } else {
            let (right, old_value) = match node.right.take() {
                Some(right) => Llrb::do_delete(right, key),
                None => (None, None),
            };
            node.right = right;
            (Some(Llrb::fixup(node)), old_value)
        }
    }

    fn remove_min(mut node: Box<Node<K, V>>) -> Delmin<K, V> {
        if node.left.is_none() {
            return (None, Some(node));
        }
        if !is_red(node.left_deref()) && !node.is_red_left_left() {
            node = Llrb::move_red_left(node);
        }
        let (left, old_node) = match node.left.take() {
            Some(left) => Llrb::remove_min(left),
            None => (None, None),
        };
        node.left = left;
        (Some(Llrb::fixup(node)), old_node)
    }

    fn remove_max(mut node: Box<Node<K, V>>) -> Delmin<K, V> {
        if is_red(node.left_deref()) {
            node = Llrb::rotate_right(node);
        }
        if node.right.is_none() {
            return (None, Some(node));
        }
        if !is_red(node.right_deref()) && !node.is_red_right_left() {
            node = Llrb::move_red_right(node);
        }
        let (right, old_node) = match node.right.take() {
            Some(right) => Llrb::remove_max(right),
            None => (None, None),
        };
        node.right = right;
        (Some(Llrb::fixup(node)), old_node)
    }

    fn validate_tree(
        node: Option<&Node<K, V>>,
        fromred: bool,
        mut nb: usize,
        depth: usize,
        (low, high): (Option<&K>, Option<&K>),
        stats: &mut Stats,
    ) -> Result<usize, Error<K>> {
        let node = match node {
            None => {
                if let Some(depths) = stats.depths.as_mut() {
                    depths.sample(depth);
                }
                return Ok(nb);
            }
            Some(node) => node,
        };

        let red = !node.is_black();
        if fromred && red {
            return Err(Error::ConsecutiveReds);
        }
        if is_red(node.right_deref()) {
            return Err(Error::RightLeaningRed);
        }
        if !red {
            nb += 1;
        }
        match low {
            Some(low) if node.key.le(low) => {
                return Err(Error::SortError(low.clone(), node.key.clone()));
            }
            _ => (),
        }
        match high {
            Some(high) if node.key.ge(high) => {
                return Err(Error::SortError(node.key.clone(), high.clone()));
            }
            _ => (),
        }

        let (left, right) = (node.left_deref(), node.right_deref());
        let lbounds = (low, Some(&node.key));
        let lblacks = Llrb::validate_tree(left, red, nb, depth + 1, lbounds, stats)?;
        let rbounds = (Some(&node.key), high);
        let rblacks = Llrb::validate_tree(right, red, nb, depth + 1, rbounds, stats)?;
        if lblacks != rblacks {
            let err = format!("left: {} right: {}", lblacks, rblacks);
            return Err(Error::UnbalancedBlacks(err));
        }

        let computed = 1 + size(left) + size(right);
        if node.size != computed {
            let key = node.key.clone();
            return Err(Error::SizeMismatch(key, node.size, computed));
        }
        Ok(lblacks)
    }

    fn validate_ranks(&self) -> Result<(), Error<K>> {
        for i in 0..self.len() {
            let key = self.select(i)?;
            if self.rank(&key) != i {
                return Err(Error::RankMismatch(i));
            }
        }
        for key in self.keys().into_iter() {
            let rank = self.rank(&key);
            if self.select(rank)? != key {
                return Err(Error::RankMismatch(rank));
            }
        }
        Ok(())
    }

    //--------- rotation routines for 2-3 algorithm ----------------

    fn walkuprot_23(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        if is_red(node.right_deref()) && !is_red(node.left_deref()) {
            node = Llrb::rotate_left(node);
        }
        if is_red(node.left_deref()) && node.is_red_left_left() {
            node = Llrb::rotate_right(node);
        }
        if is_red(node.left_deref()) && is_red(node.right_deref()) {
            Llrb::flip(node.deref_mut())
        }
        node.update_size();
        node
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    (r)                 (r)  \
    //            /       \                 /     \
    //          left       x             node      xr
    //                    / \            /  \
    //                  xl   xr       left   xl
    //
    fn rotate_left(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        let mut x = match node.right.take() {
            Some(x) if !x.is_black() => x,
            _ => panic!("rotate_left(): rotating a black link ? Call the programmer"),
        };
        node.right = x.left.take();
        x.black = node.black;
        node.set_red();
        node.update_size();
        x.left = Some(node);
        x.update_size();
        x
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //            (r)   \                   (r)  \
    //           /       \                 /      \
    //          x       right             xl      node
    //         / \                                / \
    //       xl   xr                             xr  right
    //
    fn rotate_right(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        let mut x = match node.left.take() {
            Some(x) if !x.is_black() => x,
            _ => panic!("rotate_right(): rotating a black link ? Call the programmer"),
        };
        node.left = x.right.take();
        x.black = node.black;
        node.set_red();
        node.update_size();
        x.right = Some(node);
        x.update_size();
        x
    }

    //        (x)                   (!x)
    //         |                     |
    //        node                  node
    //        / \                   / \
    //      (y) (z)              (!y) (!z)
    //     /      \              /      \
    //   left    right         left    right
    //
    fn flip(node: &mut Node<K, V>) {
        if let Some(left) = node.left.as_mut() {
            left.toggle_link();
        }
        if let Some(right) = node.right.as_mut() {
            right.toggle_link();
        }
        node.toggle_link();
    }

    fn fixup(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        if is_red(node.right_deref()) {
            node = Llrb::rotate_left(node);
        }
        if is_red(node.left_deref()) && node.is_red_left_left() {
            node = Llrb::rotate_right(node);
        }
        if is_red(node.left_deref()) && is_red(node.right_deref()) {
            Llrb::flip(node.deref_mut());
        }
        node.update_size();
        node
    }

    fn move_red_left(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        Llrb::flip(node.deref_mut());
        if node.is_red_right_left() {
            node.right = node.right.take().map(Llrb::rotate_right);
            node = Llrb::rotate_left(node);
            Llrb::flip(node.deref_mut());
        }
        node
    }

    fn move_red_right(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        Llrb::flip(node.deref_mut());
        if node.is_red_left_left() {
            node = Llrb::rotate_right(node);
            Llrb::flip(node.deref_mut());
        }
        node
    }
}

fn is_red<K, V>(node: Option<&Node<K, V>>) -> bool
where
    K: Clone + Ord,
    V: Clone,
{
    node.map_or(false, |node| !node.is_black())
}

fn size<K, V>(node: Option<&Node<K, V>>) -> usize
where
    K: Clone + Ord,
    V: Clone,
{
    node.map_or(0, |node| node.size)
}

fn height<K, V>(node: Option<&Node<K, V>>) -> isize
where
    K: Clone + Ord,
    V: Clone,
{
    match node {
        None => -1,
        Some(node) => {
            let (l, r) = (height(node.left_deref()), height(node.right_deref()));
            1 + cmp::max(l, r)
        }
    }
}

/// Iterate over a range of entries in sort order. Entries are fetched
/// from the tree in batches and cloned out, refer [`Llrb::set_iter_limit`].
pub struct Range<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    root: Option<&'a Node<K, V>>,
    node_iter: std::vec::IntoIter<(K, V)>,
    low: Option<Bound<K>>,
    high: Bound<K>,
    limit: usize,
}

impl<'a, K, V> Range<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Iterate the same range in reverse order. If this iterator has
    /// already yielded items, they are not accounted for.
    pub fn rev(self) -> Reverse<'a, K, V> {
        let (high, low) = match self.low {
            Some(low) => (Some(self.high), low),
            None => (None, Bound::Unbounded),
        };
        Reverse {
            root: self.root,
            node_iter: vec![].into_iter(),
            high,
            low,
            limit: self.limit,
        }
    }

    fn range_iter(
        &self,
        node: Option<&Node<K, V>>,
        acc: &mut Vec<(K, V)>, // accumulator for batch of nodes
    ) -> bool {
        let node = match node {
            None => return true,
            Some(node) => node,
        };

        let (left, right) = (node.left_deref(), node.right_deref());
        match &self.low {
            Some(Bound::Included(qow)) if node.key.lt(qow) => {
                return self.range_iter(right, acc);
            }
            Some(Bound::Excluded(qow)) if node.key.le(qow) => {
                return self.range_iter(right, acc);
            }
            _ => (),
        }

        if !self.range_iter(left, acc) {
            return false;
        }

        acc.push((node.key.clone(), node.value.clone()));
        if acc.len() >= self.limit {
            return false;
        }

        self.range_iter(right, acc)
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.node_iter.next() {
            None if self.low.is_some() => {
                let mut acc: Vec<(K, V)> = Vec::with_capacity(self.limit);
                self.range_iter(self.root, &mut acc);
                self.low = acc.last().map(|x| Bound::Excluded(x.0.clone()));
                self.node_iter = acc.into_iter();
                self.node_iter.next()
            }
            None => None,
            item @ Some(_) => item,
        };
        // check for upper bound
        match item {
            None => None,
            Some(item) => match &self.high {
                Bound::Unbounded => Some(item),
                Bound::Included(qigh) if item.0.le(qigh) => Some(item),
                Bound::Excluded(qigh) if item.0.lt(qigh) => Some(item),
                _ => {
                    self.low = None;
                    None
                }
            },
        }
    }
}

/// Iterate over a range of entries in reverse sort order, refer
/// [`Range::rev`].
pub struct Reverse<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    root: Option<&'a Node<K, V>>,
    node_iter: std::vec::IntoIter<(K, V)>,
    high: Option<Bound<K>>,
    low: Bound<K>,
    limit: usize,
}

impl<'a, K, V> Reverse<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    fn reverse_iter(
        &self,
        node: Option<&Node<K, V>>,
        acc: &mut Vec<(K, V)>, // accumulator for batch of nodes
    ) -> bool {
        let node = match node {
            None => return true,
            Some(node) => node,
        };

        let (left, right) = (node.left_deref(), node.right_deref());
        match &self.high {
            Some(Bound::Included(qigh)) if node.key.gt(qigh) => {
                return self.reverse_iter(left, acc);
            }
            Some(Bound::Excluded(qigh)) if node.key.ge(qigh) => {
                return self.reverse_iter(left, acc);
            }
            _ => (),
        }

        if !self.reverse_iter(right, acc) {
            return false;
        }

        acc.push((node.key.clone(), node.value.clone()));
        if acc.len() >= self.limit {
            return false;
        }

        self.reverse_iter(left, acc)
    }
}

impl<'a, K, V> Iterator for Reverse<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.node_iter.next() {
            None if self.high.is_some() => {
                let mut acc: Vec<(K, V)> = Vec::with_capacity(self.limit);
                self.reverse_iter(self.root, &mut acc);
                self.high = acc.last().map(|x| Bound::Excluded(x.0.clone()));
                self.node_iter = acc.into_iter();
                self.node_iter.next()
            }
            None => None,
            item @ Some(_) => item,
        };
        // check for lower bound
        match item {
            None => None,
            Some(item) => match &self.low {
                Bound::Unbounded => Some(item),
                Bound::Included(qow) if item.0.ge(qow) => Some(item),
                Bound::Excluded(qow) if item.0.gt(qow) => Some(item),
                _ => {
                    self.high = None;
                    None
                }
            },
        }
    }
}

/// Node corresponds to a single entry in Llrb instance.
#[derive(Clone)]
pub struct Node<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    key: K,
    value: V,
    black: bool,                    // store: black or red
    size: usize,                    // number of entries in this sub-tree
    left: Option<Box<Node<K, V>>>,  // store: left child
    right: Option<Box<Node<K, V>>>, // store: right child
}

// Primary operations on a single node.
impl<K, V> Node<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    // CREATE operation
    fn new(key: K, value: V, black: bool) -> Box<Node<K, V>> {
        Box::new(Node {
            key,
            value,
            black,
            size: 1,
            left: None,
            right: None,
        })
    }

    #[inline]
    fn left_deref(&self) -> Option<&Node<K, V>> {
        self.left.as_ref().map(Deref::deref)
    }

    #[inline]
    fn right_deref(&self) -> Option<&Node<K, V>> {
        self.right.as_ref().map(Deref::deref)
    }

    #[inline]
    fn is_red_left_left(&self) -> bool {
        self.left_deref().map_or(false, |left| is_red(left.left_deref()))
    }

    #[inline]
    fn is_red_right_left(&self) -> bool {
        self.right_deref().map_or(false, |right| is_red(right.left_deref()))
    }

    #[inline]
    fn update_size(&mut self) {
        self.size = 1 + size(self.left_deref()) + size(self.right_deref());
    }

    #[inline]
    fn set_red(&mut self) {
        self.black = false
    }

    #[inline]
    fn set_black(&mut self) {
        self.black = true
    }

    #[inline]
    fn toggle_link(&mut self) {
        self.black = !self.black
    }

    #[inline]
    fn is_black(&self) -> bool {
        self.black
    }
}

/// Statistics on [`Llrb`] tree. Serves two purpose:
///
/// * To get partial but quick statistics via [`Llrb::stats`] method.
/// * To get full statisics via [`Llrb::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number entries in [`Llrb`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size, including over-head for `Llrb<k,V>`. Although
    /// the node overhead is constant, the node size varies based on
    /// key and value types. EG:
    ///
    /// ```
    /// use llrb_table::Llrb;
    /// let llrb: Llrb<u64,i128> = Llrb::new("myinstance");
    ///
    /// // size of key: 8 bytes
    /// // size of value: 16 bytes
    /// // overhead: color, sub-tree size and two child pointers.
    /// assert!(llrb.stats().node_size() >= 8 + 16 + 8 + 16);
    /// ```
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes from root to leaf, on both left
    /// and right child.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics, available only with
    /// [`Llrb::validate`].
    pub fn depths(&self) -> Option<Depth> {
        match &self.depths {
            Some(depths) if depths.samples() > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
