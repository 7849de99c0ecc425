//! Merkle tree implementation using the Roughtime leaf and node tweak
//! values.
//!
//! One tree covers one batch of requests: each leaf is either a client
//! nonce or a whole request packet (the version profile decides), the root
//! goes into the SREP, and each response carries the sibling path proving
//! its leaf's inclusion. Version 0 keeps the full 64-byte SHA-512 output;
//! everything later truncates to the first 32 bytes.

// The merkle crate uses only safe Rust.
#![forbid(unsafe_code)]

use aws_lc_rs::{constant_time, digest};
pub use roughcast_protocol::version::TreeOrder;
use roughcast_protocol::version::VersionProfile;
use thiserror::Error;

/// Prepended to a leaf's data before hashing.
const LEAF_TWEAK: &[u8] = &[0x00];

/// Prepended to the left and right child values before hashing.
const NODE_TWEAK: &[u8] = &[0x01];

type Hash = Vec<u8>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("tree has no leaves")]
    EmptyTree,

    #[error("leaf index {index} is outside a batch of {leaves}")]
    IndexOutOfRange { index: usize, leaves: usize },

    #[error("path length {length} is not a multiple of {hash_len}")]
    BadPathLength { length: usize, hash_len: usize },

    #[error("index has set bits beyond the path depth")]
    IndexBeyondPath,
}

/// Tree shape parameters: how much of the SHA-512 output to keep and which
/// side the even-indexed node goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleOptions {
    hash_len: usize,
    order: TreeOrder,
}

impl MerkleOptions {
    /// `hash_len` must be 32 or 64.
    pub fn new(hash_len: usize, order: TreeOrder) -> MerkleOptions {
        assert!(
            hash_len == 32 || hash_len == 64,
            "hash length must be 32 or 64, got {hash_len}"
        );
        MerkleOptions { hash_len, order }
    }

    pub fn for_profile(profile: &VersionProfile) -> MerkleOptions {
        MerkleOptions::new(profile.hash_len, profile.tree_order)
    }

    pub fn hash_len(&self) -> usize {
        self.hash_len
    }

    pub fn order(&self) -> TreeOrder {
        self.order
    }
}

/// A Merkle tree built bottom-up with every level retained, so the root is
/// computed once and the per-leaf paths are cheap lookups afterwards.
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
    opts: MerkleOptions,
}

impl MerkleTree {
    pub fn new(opts: MerkleOptions) -> MerkleTree {
        MerkleTree {
            levels: vec![vec![]],
            opts,
        }
    }

    pub fn push_leaf(&mut self, data: &[u8]) {
        let hash = hash_leaf(&self.opts, data);
        self.levels[0].push(hash);
    }

    pub fn num_leaves(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Drop all nodes, keeping the allocations for the next batch.
    pub fn clear(&mut self) {
        for level in &mut self.levels {
            level.clear();
        }
    }

    /// Build every level and return the root. A lone node at the end of a
    /// level is combined with itself.
    pub fn compute_root(&mut self) -> Result<Hash, MerkleError> {
        if self.levels[0].is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let mut level = 0;
        while self.levels[level].len() > 1 {
            if self.levels.len() < level + 2 {
                self.levels.push(Vec::new());
            }

            let (lower, upper) = self.levels.split_at_mut(level + 1);
            let nodes = &lower[level];
            let next = &mut upper[0];
            next.clear();
            next.reserve(nodes.len().div_ceil(2));

            for pair in nodes.chunks(2) {
                let even = &pair[0];
                let odd = pair.get(1).unwrap_or(&pair[0]);
                // natural order puts the even-indexed node on the left
                let node = match self.opts.order {
                    TreeOrder::Natural => hash_node(&self.opts, even, odd),
                    TreeOrder::Mirrored => hash_node(&self.opts, odd, even),
                };
                next.push(node);
            }

            level += 1;
        }

        Ok(self.levels[level][0].clone())
    }

    /// The sibling path for the leaf at `index`, as concatenated hashes.
    /// Valid only after `compute_root`.
    pub fn path_for(&self, mut index: usize) -> Result<Vec<u8>, MerkleError> {
        if index >= self.num_leaves() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                leaves: self.num_leaves(),
            });
        }

        let mut path = Vec::with_capacity(self.levels.len() * self.opts.hash_len);

        // only the root level (or a cleared level) holds fewer than two
        // nodes; everything above the leaves keeps at least a pair
        for nodes in &self.levels {
            if nodes.len() <= 1 {
                break;
            }

            let sibling = index ^ 1;
            // a lone node at the end of a level is its own sibling
            let node = nodes.get(sibling).unwrap_or(&nodes[index]);
            path.extend_from_slice(node);
            index >>= 1;
        }

        Ok(path)
    }
}

fn hash_leaf(opts: &MerkleOptions, data: &[u8]) -> Hash {
    hash_parts(opts, &[LEAF_TWEAK, data])
}

fn hash_node(opts: &MerkleOptions, left: &[u8], right: &[u8]) -> Hash {
    hash_parts(opts, &[NODE_TWEAK, left, right])
}

fn hash_parts(opts: &MerkleOptions, parts: &[&[u8]]) -> Hash {
    let mut ctx = digest::Context::new(&digest::SHA512);
    for part in parts {
        ctx.update(part);
    }
    ctx.finish().as_ref()[..opts.hash_len].to_vec()
}

/// Root over `leaves` without keeping the tree around.
pub fn compute_root(leaves: &[&[u8]], opts: MerkleOptions) -> Result<Hash, MerkleError> {
    build_tree(leaves, opts)?.compute_root()
}

/// Inclusion path for `leaves[index]` without keeping the tree around.
pub fn build_path(
    leaves: &[&[u8]],
    index: usize,
    opts: MerkleOptions,
) -> Result<Vec<u8>, MerkleError> {
    let mut tree = build_tree(leaves, opts)?;
    tree.compute_root()?;
    tree.path_for(index)
}

fn build_tree(leaves: &[&[u8]], opts: MerkleOptions) -> Result<MerkleTree, MerkleError> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyTree);
    }

    let mut tree = MerkleTree::new(opts);
    for leaf in leaves {
        tree.push_leaf(leaf);
    }
    Ok(tree)
}

/// Recompute the root a path claims, starting from `leaf_data` at `index`.
///
/// At step `i` the `i`-th bit of the index decides which side the running
/// hash goes on; with `Natural` order a zero bit puts it on the left,
/// `Mirrored` swaps the sides. Once the path is exhausted no index bits may
/// remain set.
pub fn root_from_path(
    leaf_data: &[u8],
    index: u64,
    path: &[u8],
    opts: MerkleOptions,
) -> Result<Hash, MerkleError> {
    if path.len() % opts.hash_len != 0 {
        return Err(MerkleError::BadPathLength {
            length: path.len(),
            hash_len: opts.hash_len,
        });
    }

    let mut hash = hash_leaf(&opts, leaf_data);
    let mut index = index;

    for sibling in path.chunks(opts.hash_len) {
        let current_is_left = match opts.order {
            TreeOrder::Natural => index & 1 == 0,
            TreeOrder::Mirrored => index & 1 == 1,
        };

        hash = if current_is_left {
            hash_node(&opts, &hash, sibling)
        } else {
            hash_node(&opts, sibling, &hash)
        };
        index >>= 1;
    }

    if index != 0 {
        return Err(MerkleError::IndexBeyondPath);
    }

    Ok(hash)
}

/// Outcome of checking an inclusion proof against a claimed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofCheck {
    pub ok: bool,
    pub reconstructed: Hash,
}

/// Reconstruct the root from the proof and compare it to `root` in
/// constant time.
pub fn verify_proof(
    root: &[u8],
    leaf_data: &[u8],
    index: u64,
    path: &[u8],
    opts: MerkleOptions,
) -> Result<ProofCheck, MerkleError> {
    let reconstructed = root_from_path(leaf_data, index, path, opts)?;
    let ok = constant_time::verify_slices_are_equal(&reconstructed, root).is_ok();

    Ok(ProofCheck { ok, reconstructed })
}
