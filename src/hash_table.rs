use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem;

use crate::error::InvalidConfiguration;

/// Bucket count used by [`HashTable::new`].
pub const DEFAULT_CAPACITY: usize = 16;

/// Load factor used by [`HashTable::new`].
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Handle marking the end of a chain, an empty bucket, or an empty free list.
const NIL: usize = usize::MAX;

/// Smallest population `n` for which `n >= capacity * load_factor` holds.
#[inline(always)]
fn growth_threshold(capacity: usize, load_factor: f32) -> usize {
    (capacity as f32 * load_factor).ceil() as usize
}

#[derive(Clone)]
struct Node<V> {
    hash: u64,
    next: usize,
    value: V,
}

#[derive(Clone)]
enum Slot<V> {
    Occupied(Node<V>),
    Vacant { next_free: usize },
}

impl<V> Slot<V> {
    #[inline(always)]
    fn node(&self) -> &Node<V> {
        match self {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("chain link points at a vacant slot"),
        }
    }

    #[inline(always)]
    fn node_mut(&mut self) -> &mut Node<V> {
        match self {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("chain link points at a vacant slot"),
        }
    }

    #[inline(always)]
    fn into_node(self) -> Node<V> {
        match self {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("chain link points at a vacant slot"),
        }
    }
}

/// Debug statistics for hash table analysis.
///
/// Compiled with `cfg(test)` or the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Population at which the next insertion triggers a resize
    pub max_pop: usize,
    /// Load factor the table was configured with
    pub configured_load_factor: f32,
    /// Actual load (populated / capacity)
    pub load_factor: f64,
    /// Buckets with no chain
    pub empty_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Arena slots released by removals and awaiting reuse
    pub free_slots: usize,
    /// Total memory in bytes held by the bucket array and entry arena
    pub total_bytes: usize,
    /// Bytes held by empty buckets, free slots, and spare vector capacity
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} buckets ({:.2}% load, resize at {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_pop
        );
        println!(
            "Configured load factor: {:.2}",
            self.configured_load_factor
        );
        println!(
            "Chains: {} empty buckets, longest chain {}",
            self.empty_buckets, self.longest_chain
        );
        println!("Free slots: {}", self.free_slots);
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// Number of buckets per chain length.
///
/// `counts[n]` is the number of buckets whose chain holds exactly `n` entries,
/// so `counts[0]` counts the empty buckets.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHistogram {
    /// Bucket count for each chain length
    pub counts: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ChainHistogram {
    /// Total number of entries accounted for by the histogram.
    pub fn total_entries(&self) -> usize {
        self.counts
            .iter()
            .enumerate()
            .map(|(len, &count)| len * count)
            .sum()
    }

    /// Pretty-prints the histogram horizontally using stdout, one row per
    /// chain length.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("chain histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "chain histogram ({} entries in {} buckets):",
            self.total_entries(),
            self.counts.iter().sum::<usize>()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let ch = match units % 8 {
                0 => None,
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                _ => Some('▉'),
            };
            if let Some(ch) = ch {
                bar.push(ch);
            }
            bar
        };

        for (len, &count) in self.counts.iter().enumerate() {
            println!("{:>3} | {} ({})", len, make_bar(count), count);
        }
    }
}

/// A hash table using separate chaining over an index-linked entry arena.
///
/// `HashTable<V>` stores values of type `V`. Like the rest of this crate's
/// raw API, every operation takes the caller's 64-bit hash of the value's
/// key and an equality predicate; the table never hashes anything itself.
///
/// Buckets hold the handle of their chain head. Entries live in a single
/// arena `Vec`, each carrying its cached hash and the handle of its successor.
/// New entries are prepended to their chain. Once the population reaches
/// `capacity * load_factor` the bucket count doubles and every entry is
/// relinked in place; entries are never moved, so handles stay valid across
/// resizes. The table never shrinks.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use chain_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     chain_hash::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     chain_hash::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).map(|p| p.name.as_str()), Some("Alice"));
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    buckets: Vec<usize>,
    slots: Vec<Slot<V>>,
    free_head: usize,

    populated: usize,
    max_pop: usize,
    load_factor: f32,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field(
                "chains",
                &self
                    .buckets
                    .iter()
                    .map(|&head| self.chain_len(head))
                    .collect::<Vec<_>>(),
            )
            .field("populated", &self.populated)
            .field("capacity", &self.buckets.len())
            .field("max_pop", &self.max_pop)
            .field("free_slots", &(self.slots.len() - self.populated))
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] buckets and a load
    /// factor of [`DEFAULT_LOAD_FACTOR`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::new();
    /// assert_eq!(table.capacity(), 16);
    /// assert!(table.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::from_validated(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR)
    }

    /// Creates an empty table with `capacity` buckets that doubles once its
    /// population reaches `capacity * load_factor`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::ZeroCapacity`] if `capacity` is zero
    /// and [`InvalidConfiguration::LoadFactor`] unless `0 < load_factor <= 1`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::InvalidConfiguration;
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::with_capacity_and_load_factor(100, 0.5).unwrap();
    /// assert_eq!(table.capacity(), 100);
    ///
    /// assert_eq!(
    ///     HashTable::<u64>::with_capacity_and_load_factor(0, 0.5).unwrap_err(),
    ///     InvalidConfiguration::ZeroCapacity
    /// );
    /// ```
    pub fn with_capacity_and_load_factor(
        capacity: usize,
        load_factor: f32,
    ) -> Result<Self, InvalidConfiguration> {
        if capacity == 0 {
            return Err(InvalidConfiguration::ZeroCapacity);
        }
        if !(load_factor > 0.0 && load_factor <= 1.0) {
            return Err(InvalidConfiguration::LoadFactor(load_factor));
        }
        Ok(Self::from_validated(capacity, load_factor))
    }

    fn from_validated(capacity: usize, load_factor: f32) -> Self {
        Self {
            buckets: vec![NIL; capacity],
            slots: Vec::new(),
            free_head: NIL,
            populated: 0,
            max_pop: growth_threshold(capacity, load_factor),
            load_factor,
        }
    }

    #[inline(always)]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn chain_len(&self, head: usize) -> usize {
        let mut len = 0;
        let mut cursor = head;
        while cursor != NIL {
            len += 1;
            cursor = self.slots[cursor].node().next;
        }
        len
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of buckets.
    ///
    /// This only grows: it doubles whenever an insertion brings the
    /// population to `capacity * load_factor`, and nothing ever shrinks it.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the load factor the table was configured with.
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Walks the chain for `hash`, returning the matching entry's handle and
    /// the handle of its predecessor (`NIL` if it is the chain head).
    #[inline]
    fn find_link(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<(usize, usize)> {
        let mut prev = NIL;
        let mut cursor = self.buckets[self.bucket_index(hash)];
        while cursor != NIL {
            let node = self.slots[cursor].node();
            if node.hash == hash && eq(&node.value) {
                return Some((prev, cursor));
            }
            prev = cursor;
            cursor = node.next;
        }
        None
    }

    /// Finds a value in the table by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(hash_u64(42), |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(hash_u64(42), |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(hash_u64(99), |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        if self.populated == 0 {
            return None;
        }

        self.find_link(hash, eq)
            .map(|(_, index)| &self.slots[index].node().value)
    }

    /// Finds a value in the table by hash and equality predicate, returning a
    /// mutable reference.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        if self.populated == 0 {
            return None;
        }

        let (_, index) = self.find_link(hash, eq)?;
        Some(&mut self.slots[index].node_mut().value)
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// A vacant entry inserts at the head of the bucket's chain and resizes
    /// the table afterwards if the new population reaches the growth
    /// threshold.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::Entry;
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         entry.get_mut().push('!');
    ///     }
    /// }
    ///
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        match self.find_link(hash, eq) {
            Some((prev, index)) => Entry::Occupied(OccupiedEntry {
                table: self,
                prev,
                index,
            }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Removes and returns a value from the table.
    ///
    /// Removing a value that is not present leaves the table untouched and
    /// returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(hash_u64(42), |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(hash_u64(42), |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(hash_u64(99), |&n| n == 99), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        if self.populated == 0 {
            return None;
        }

        let (prev, index) = self.find_link(hash, eq)?;
        Some(self.unlink(prev, index))
    }

    /// Detaches `index` from its chain and frees its slot.
    fn unlink(&mut self, prev: usize, index: usize) -> V {
        let node = self.slots[index].node();
        let next = node.next;
        if prev == NIL {
            let bucket = self.bucket_index(node.hash);
            debug_assert_eq!(self.buckets[bucket], index);
            self.buckets[bucket] = next;
        } else {
            self.slots[prev].node_mut().next = next;
        }

        self.populated -= 1;
        let slot = mem::replace(
            &mut self.slots[index],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = index;
        slot.into_node().value
    }

    /// Links a value the caller knows to be absent, then grows the table if
    /// the population reached the threshold. Returns the new entry's handle.
    fn insert_unique(&mut self, hash: u64, value: V) -> usize {
        let bucket = self.bucket_index(hash);
        let node = Node {
            hash,
            next: self.buckets[bucket],
            value,
        };

        let index = if self.free_head == NIL {
            self.slots.push(Slot::Occupied(node));
            self.slots.len() - 1
        } else {
            let index = self.free_head;
            match self.slots[index] {
                Slot::Vacant { next_free } => self.free_head = next_free,
                Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
            }
            self.slots[index] = Slot::Occupied(node);
            index
        };

        self.buckets[bucket] = index;
        self.populated += 1;

        if self.populated >= self.max_pop {
            self.resize_rehash();
        }

        index
    }

    /// Doubles the bucket count and relinks every entry under the new
    /// capacity. Entries keep their slots; only `next` links change.
    #[cold]
    #[inline(never)]
    fn resize_rehash(&mut self) {
        let new_capacity = self
            .buckets
            .len()
            .checked_mul(2)
            .expect("capacity overflow");
        let mut buckets = vec![NIL; new_capacity];

        for &head in &self.buckets {
            let mut cursor = head;
            while cursor != NIL {
                let node = self.slots[cursor].node_mut();
                let next = node.next;
                let bucket = (node.hash % new_capacity as u64) as usize;
                node.next = buckets[bucket];
                buckets[bucket] = cursor;
                cursor = next;
            }
        }

        self.buckets = buckets;
        self.max_pop = growth_threshold(new_capacity, self.load_factor);
    }

    /// Removes all elements from the table.
    ///
    /// The bucket count is preserved.
    pub fn clear(&mut self) {
        self.buckets.fill(NIL);
        self.slots.clear();
        self.free_head = NIL;
        self.populated = 0;
    }

    /// Returns an iterator over all values in the table.
    ///
    /// Buckets are visited in ascending index order and each chain from head
    /// to tail. Every call starts a fresh traversal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity_and_load_factor(8, 1.0).unwrap();
    /// for n in [3u64, 1, 9, 6] {
    ///     // Using the value itself as its hash: 1 and 9 share bucket 1.
    ///     table.entry(n, |&v: &u64| v == n).or_insert(n);
    /// }
    ///
    /// let order: Vec<u64> = table.iter().copied().collect();
    /// assert_eq!(order, [9, 1, 3, 6]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            table: self,
            bucket_index: 0,
            cursor: NIL,
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table
    /// in traversal order.
    ///
    /// The table is emptied as soon as this is called; values the iterator
    /// does not yield are dropped with it. The bucket count is preserved.
    pub fn drain(&mut self) -> Drain<'_, V> {
        let capacity = self.buckets.len();
        let buckets = mem::replace(&mut self.buckets, vec![NIL; capacity]);
        let slots = mem::take(&mut self.slots);
        let remaining = mem::replace(&mut self.populated, 0);
        self.free_head = NIL;

        Drain {
            buckets,
            slots,
            bucket_index: 0,
            cursor: NIL,
            remaining,
            _table: PhantomData,
        }
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Requires the `stats` feature outside of tests.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let mut empty_buckets = 0;
        let mut longest_chain = 0;
        for &head in &self.buckets {
            let len = self.chain_len(head);
            if len == 0 {
                empty_buckets += 1;
            }
            longest_chain = longest_chain.max(len);
        }

        let free_slots = self.slots.len() - self.populated;
        let bucket_size = mem::size_of::<usize>();
        let slot_size = mem::size_of::<Slot<V>>();

        DebugStats {
            populated: self.populated,
            capacity: self.buckets.len(),
            max_pop: self.max_pop,
            configured_load_factor: self.load_factor,
            load_factor: self.populated as f64 / self.buckets.len() as f64,
            empty_buckets,
            longest_chain,
            free_slots,
            total_bytes: self.buckets.capacity() * bucket_size + self.slots.capacity() * slot_size,
            wasted_bytes: empty_buckets * bucket_size
                + (self.buckets.capacity() - self.buckets.len()) * bucket_size
                + (free_slots + self.slots.capacity() - self.slots.len()) * slot_size,
        }
    }

    /// Computes how many buckets hold chains of each length.
    ///
    /// Requires the `stats` feature outside of tests.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> ChainHistogram {
        let mut counts = vec![0usize; 1];
        for &head in &self.buckets {
            let len = self.chain_len(head);
            if len >= counts.len() {
                counts.resize(len + 1, 0);
            }
            counts[len] += 1;
        }
        ChainHistogram { counts }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - no value in the table matched
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is present in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    ///
    /// The closure only runs for vacant entries.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to an occupied entry's value and returns it. Vacant
    /// entries return `None` without inserting anything.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// This struct is created by the [`entry`] method on [`HashTable`] when no
/// value matched.
///
/// [`entry`]: HashTable::entry
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value at the head of its chain and returns a mutable
    /// reference to it.
    ///
    /// The table may resize before this returns; the reference stays valid
    /// because resizing relinks entries without moving them.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        let index = table.insert_unique(self.hash, value);
        &mut table.slots[index].node_mut().value
    }
}

/// A view into an occupied entry in the hash table.
///
/// This struct is created by the [`entry`] method on [`HashTable`] when a
/// value matched.
///
/// [`entry`]: HashTable::entry
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    prev: usize,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.table.slots[self.index].node().value
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.table.slots[self.index].node_mut().value
    }

    /// Converts the entry into a mutable reference bound to the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        &mut table.slots[self.index].node_mut().value
    }

    /// Unlinks the entry from its chain and returns its value.
    pub fn remove(self) -> V {
        self.table.unlink(self.prev, self.index)
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    table: &'a HashTable<V>,
    bucket_index: usize,
    cursor: usize,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            bucket_index: self.bucket_index,
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let table = self.table;
        while self.cursor == NIL {
            self.cursor = table.buckets[self.bucket_index];
            self.bucket_index += 1;
        }

        let node = table.slots[self.cursor].node();
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V> {
    buckets: Vec<usize>,
    slots: Vec<Slot<V>>,
    bucket_index: usize,
    cursor: usize,
    remaining: usize,
    _table: PhantomData<&'a mut HashTable<V>>,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        while self.cursor == NIL {
            self.cursor = self.buckets[self.bucket_index];
            self.bucket_index += 1;
        }

        let slot = mem::replace(&mut self.slots[self.cursor], Slot::Vacant { next_free: NIL });
        let node = slot.into_node();
        self.cursor = node.next;
        self.remaining -= 1;
        Some(node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}

impl<V> FusedIterator for Drain<'_, V> {}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn insert_item(table: &mut HashTable<Item>, hash: u64, key: u64, value: i32) {
        match table.entry(hash, |v| v.key == key) {
            Entry::Vacant(v) => {
                v.insert(Item { key, value });
            }
            Entry::Occupied(_) => panic!("unexpected occupied for {key}: {table:#?}"),
        }
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, (k as i32) * 2);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }
        assert_eq!(table.len(), 32);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k).map(|v| v.value),
                Some((k as i32) * 2)
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);

        insert_item(&mut table, hash, k, 7);

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev_value = occ.get().value;
                occ.get_mut().value = 11;
                assert_eq!(prev_value, 7);
            }
            Entry::Vacant(_) => panic!("should be occupied: {}#{:02X} in {:#?}", k, hash, table),
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(hash, |v| v.key == k).unwrap().value, 11);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..5u64 {
            insert_item(&mut table, hash_key(&state, k), k, 1);
        }

        for k in 0..5u64 {
            if let Some(v) = table.find_mut(hash_key(&state, k), |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let v = table.find(hash_key(&state, k), |v| v.key == k).unwrap();
            assert_eq!(v.value, 10);
        }
        assert!(table.find_mut(hash_key(&state, 77), |v| v.key == 77).is_none());
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..8u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }
        assert_eq!(table.len(), 8);
        for k in [0u64, 3, 7] {
            let removed = table
                .remove(hash_key(&state, k), |v| v.key == k)
                .expect("should remove");
            assert_eq!(removed.key, k);
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_none());
        }
        assert_eq!(table.len(), 5);

        for k in [1u64, 2, 4, 5, 6] {
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_some());
        }
    }

    #[test]
    fn remove_missing_is_noop() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        assert!(table.remove(hash_key(&state, 1), |v| v.key == 1).is_none());

        for k in 0..4u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }
        let before: Vec<Item> = table.iter().cloned().collect();

        assert!(table.remove(hash_key(&state, 1000), |v| v.key == 1000).is_none());
        assert_eq!(table.len(), 4);
        assert_eq!(table.iter().cloned().collect::<Vec<_>>(), before);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, k as i32);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                })
            );
        }

        assert_eq!(table.len(), 100000);
        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k).map(|v| v.value),
                Some(k as i32)
            );
        }
    }

    #[test]
    fn explicit_collision() {
        let mut table: HashTable<Item> = HashTable::new();
        let hash = 0;
        for k in 0..65u64 {
            insert_item(&mut table, hash, k, k as i32);
        }

        assert_eq!(table.len(), 65);
        for k in 0..65u64 {
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                }),
                "{:#?}",
                table
            );
        }

        assert_eq!(table.remove(hash, |v| v.key == 32).map(|v| v.key), Some(32));
        assert!(table.find(hash, |v| v.key == 32).is_none());
        for k in (0..65u64).filter(|&k| k != 32) {
            assert!(table.find(hash, |v| v.key == k).is_some());
        }
        assert_eq!(table.len(), 64);
    }

    #[test]
    fn growth_scenario() {
        let mut table: HashTable<(&str, i32)> =
            HashTable::with_capacity_and_load_factor(2, 0.75).unwrap();

        table.entry(10, |(k, _)| *k == "a").or_insert(("a", 1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.capacity(), 2);

        table.entry(11, |(k, _)| *k == "b").or_insert(("b", 2));
        assert_eq!(table.len(), 2);
        assert_eq!(table.capacity(), 4);

        assert_eq!(table.find(10, |(k, _)| *k == "a"), Some(&("a", 1)));
        assert_eq!(table.find(11, |(k, _)| *k == "b"), Some(&("b", 2)));

        assert_eq!(table.remove(10, |(k, _)| *k == "a"), Some(("a", 1)));
        assert_eq!(table.len(), 1);
        assert!(table.find(10, |(k, _)| *k == "a").is_none());
        assert_eq!(table.find(11, |(k, _)| *k == "b"), Some(&("b", 2)));
    }

    #[test]
    fn default_threshold() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in 0..11u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }
        assert_eq!(table.capacity(), 16);

        // 12 >= 16 * 0.75
        table.entry(11, |&v| v == 11).or_insert(11);
        assert_eq!(table.capacity(), 32);
    }

    #[test]
    fn resize_preserves_contents() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity_and_load_factor(1, 0.75).unwrap();
        let mut resizes = 0;

        for k in 0..200u64 {
            let before = table.capacity();
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
            if table.capacity() != before {
                assert_eq!(table.capacity(), before * 2);
                resizes += 1;

                for j in 0..=k {
                    assert_eq!(
                        table.find(hash_key(&state, j), |v| v.key == j).map(|v| v.value),
                        Some(j as i32),
                        "{table:#?}"
                    );
                }
                assert_eq!(table.iter().count(), k as usize + 1);
            }
        }

        assert!(resizes >= 2);
        assert_eq!(table.len(), 200);
    }

    #[test]
    fn capacity_never_shrinks() {
        let mut table: HashTable<u64> = HashTable::with_capacity_and_load_factor(4, 1.0).unwrap();
        for n in 0..64u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }
        let grown = table.capacity();
        assert!(grown >= 64);

        for n in 0..64u64 {
            assert_eq!(table.remove(n, |&v| v == n), Some(n));
        }
        assert!(table.is_empty());
        assert_eq!(table.capacity(), grown);

        table.clear();
        assert_eq!(table.capacity(), grown);
    }

    #[test]
    fn iter_visits_buckets_in_order() {
        let mut table: HashTable<u64> = HashTable::with_capacity_and_load_factor(8, 1.0).unwrap();
        for n in [3u64, 1, 9, 6, 17] {
            table.entry(n, |&v| v == n).or_insert(n);
        }

        // Bucket 1 holds 17 -> 9 -> 1 since new entries are prepended.
        let order: Vec<u64> = table.iter().copied().collect();
        assert_eq!(order, vec![17, 9, 1, 3, 6]);
    }

    #[test]
    fn iter_is_fresh_and_exact() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 10..20u64 {
            insert_item(&mut table, hash_key(&state, k), k, (k as i32) + 1);
        }

        let mut iter = table.iter();
        assert_eq!(iter.len(), 10);
        iter.next();
        iter.next();
        assert_eq!(iter.size_hint(), (8, Some(8)));

        let collected: Vec<u64> = table.iter().map(|v| v.key).collect();
        assert_eq!(collected.len(), 10, "{:#?}", table);
        for k in 10..20u64 {
            assert!(collected.contains(&k));
        }
        assert_eq!(iter.count(), 8);

        let empty: HashTable<Item> = HashTable::new();
        assert_eq!(empty.iter().next(), None);
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 10..20u64 {
            insert_item(&mut table, hash_key(&state, k), k, (k as i32) + 1);
        }
        let capacity = table.capacity();
        let in_order: Vec<Item> = table.iter().cloned().collect();

        let drained: Vec<Item> = table.drain().collect();
        assert_eq!(drained, in_order);
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), capacity);

        for k in 10..20u64 {
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_none());
        }

        insert_item(&mut table, hash_key(&state, 10), 10, 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn drain_dropped_early_empties_table() {
        let mut table: HashTable<String> = HashTable::new();
        for n in 0..10u64 {
            table.entry(n, |s| *s == n.to_string()).or_insert(n.to_string());
        }

        let mut drain = table.drain();
        assert_eq!(drain.len(), 10);
        assert!(drain.next().is_some());
        drop(drain);

        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
        assert!(table.find(5, |s| s == "5").is_none());
    }

    #[test]
    fn forgotten_drain_leaves_table_usable() {
        let mut table: HashTable<u64> = HashTable::with_capacity_and_load_factor(8, 1.0).unwrap();
        for n in [1u64, 9, 17] {
            table.entry(n, |&v| v == n).or_insert(n);
        }

        let mut drain = table.drain();
        assert_eq!(drain.next(), Some(17));
        mem::forget(drain);

        assert_eq!(table.len(), 0);
        assert_eq!(table.iter().count(), 0);
        assert_eq!(table.capacity(), 8);
        assert!(table.find(9, |&v| v == 9).is_none());

        table.entry(9, |&v| v == 9).or_insert(9);
        assert_eq!(table.iter().copied().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn decimal_load_factors_resize_on_time() {
        // (capacity, load factor, inserts that reach capacity * load factor)
        for (capacity, load_factor, trigger) in [(10, 0.3, 3u64), (10, 0.1, 1), (20, 0.15, 3)] {
            let mut table: HashTable<u64> =
                HashTable::with_capacity_and_load_factor(capacity, load_factor).unwrap();
            for n in 0..trigger - 1 {
                table.entry(n, |&v| v == n).or_insert(n);
            }
            assert_eq!(table.capacity(), capacity, "({capacity}, {load_factor})");

            let last = trigger - 1;
            table.entry(last, |&v| v == last).or_insert(last);
            assert_eq!(table.capacity(), capacity * 2, "({capacity}, {load_factor})");
        }
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in 0..3u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }
        table.remove(1, |&v| v == 1);
        table.remove(0, |&v| v == 0);
        assert_eq!(table.debug_stats().free_slots, 2);

        table.entry(7, |&v| v == 7).or_insert(7);
        table.entry(8, |&v| v == 8).or_insert(8);
        assert_eq!(table.slots.len(), 3);
        assert_eq!(table.debug_stats().free_slots, 0);

        for n in [2u64, 7, 8] {
            assert_eq!(table.find(n, |&v| v == n), Some(&n));
        }
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert_eq!(
            HashTable::<u64>::with_capacity_and_load_factor(0, 0.75).unwrap_err(),
            InvalidConfiguration::ZeroCapacity
        );
        assert_eq!(
            HashTable::<u64>::with_capacity_and_load_factor(4, 0.0).unwrap_err(),
            InvalidConfiguration::LoadFactor(0.0)
        );
        assert_eq!(
            HashTable::<u64>::with_capacity_and_load_factor(4, 1.5).unwrap_err(),
            InvalidConfiguration::LoadFactor(1.5)
        );
        assert!(HashTable::<u64>::with_capacity_and_load_factor(4, f32::NAN).is_err());
        assert!(HashTable::<u64>::with_capacity_and_load_factor(4, -0.5).is_err());

        let table = HashTable::<u64>::with_capacity_and_load_factor(1, 1.0).unwrap();
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.load_factor(), 1.0);
    }

    #[test]
    fn vacant_insert_survives_resize() {
        let mut table: HashTable<String> = HashTable::with_capacity_and_load_factor(1, 1.0).unwrap();
        let value = table
            .entry(5, |s| s == "five")
            .or_insert_with(|| "five".to_string());
        value.push('!');

        assert_eq!(table.capacity(), 2);
        assert_eq!(table.find(5, |s| s == "five!"), Some(&"five!".to_string()));
    }

    #[test]
    fn occupied_remove_mid_chain() {
        let mut table: HashTable<&str> = HashTable::new();
        for s in ["a", "b", "c"] {
            table.entry(0, |v| *v == s).or_insert(s);
        }

        match table.entry(0, |v| *v == "b") {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), "b"),
            Entry::Vacant(_) => unreachable!("{table:#?}"),
        }
        match table.entry(0, |v| *v == "c") {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), "c"),
            Entry::Vacant(_) => unreachable!("{table:#?}"),
        }

        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().copied().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn entry_helpers() {
        let state = HashState::default();
        let mut table: HashTable<Vec<u64>> = HashTable::new();
        let hash = hash_key(&state, 1);

        assert!(table.entry(hash, |v| v.first() == Some(&1)).and_modify(|v| v.push(2)).is_none());
        assert!(table.is_empty());

        table.entry(hash, |v| v.first() == Some(&1)).or_default().push(1);
        let modified = table
            .entry(hash, |v| v.first() == Some(&1))
            .and_modify(|v| v.push(2));
        assert_eq!(modified, Some(&mut vec![1, 2]));

        let existing = table
            .entry(hash, |v| v.first() == Some(&1))
            .or_insert_with(|| panic!("should not be called"));
        assert_eq!(existing, &vec![1, 2]);
        assert_eq!(table.len(), 1);
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct StringItem {
        key: String,
        value: i32,
    }

    fn hash_string_key(state: &HashState, key: &str) -> u64 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish()
    }

    #[test]
    fn remove_string_keys() {
        let state = HashState::default();
        let mut table: HashTable<StringItem> = HashTable::new();
        let keys = ["a", "b", "c", "d", "e"];
        for (i, k) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, k);
            table.entry(hash, |v| v.key == *k).or_insert(StringItem {
                key: k.to_string(),
                value: i as i32,
            });
        }

        assert_eq!(table.len(), 5);
        let removed = table
            .remove(hash_string_key(&state, "c"), |v| v.key == "c")
            .unwrap();
        assert_eq!(removed.value, 2);
        assert_eq!(table.len(), 4);

        assert!(table.find(hash_string_key(&state, "a"), |v| v.key == "a").is_some());
        assert!(table.find(hash_string_key(&state, "c"), |v| v.key == "c").is_none());
    }

    #[test]
    fn test_clone() {
        let state = HashState::default();
        let mut original: HashTable<StringItem> = HashTable::new();
        for (i, k) in ["hello", "world", "foo"].iter().enumerate() {
            let hash = hash_string_key(&state, k);
            original.entry(hash, |v| v.key == *k).or_insert(StringItem {
                key: k.to_string(),
                value: i as i32,
            });
        }

        let mut cloned = original.clone();
        assert_eq!(cloned.len(), original.len());
        assert_eq!(
            cloned.iter().collect::<Vec<_>>(),
            original.iter().collect::<Vec<_>>()
        );

        cloned.remove(hash_string_key(&state, "foo"), |v| v.key == "foo");
        assert_eq!(cloned.len(), 2);
        assert_eq!(original.len(), 3);
        assert!(
            original
                .find(hash_string_key(&state, "foo"), |v| v.key == "foo")
                .is_some()
        );
    }

    #[test]
    fn stats_match_contents() {
        let mut table: HashTable<u64> = HashTable::with_capacity_and_load_factor(8, 1.0).unwrap();
        for n in [0u64, 8, 16, 3, 5] {
            table.entry(n, |&v| v == n).or_insert(n);
        }

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 5);
        assert_eq!(stats.capacity, 8);
        assert_eq!(stats.max_pop, 8);
        assert_eq!(stats.longest_chain, 3);
        assert_eq!(stats.empty_buckets, 5);
        assert_eq!(stats.free_slots, 0);

        let histogram = table.chain_histogram();
        assert_eq!(histogram.counts, vec![5, 2, 0, 1]);
        assert_eq!(histogram.total_entries(), 5);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    #[cfg(feature = "std")]
    fn histogram_output() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10000u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }

        table.chain_histogram().print();
        table.debug_stats().print();
        assert_eq!(table.chain_histogram().total_entries(), 10000);
    }
}
