#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]

//! # Overview
//!
//! `mediasort_core` is the similarity-and-clustering engine: turning a
//! decoded frame into a [`BitHash`][mediasort_common::BitHash]
//! ([`frame_hasher`]), comparing two files' media ([`similarity`]),
//! indexing a whole corpus for fast neighbor queries ([`vptree`]),
//! forming duplicate clusters from that index ([`dbscan`]), and picking
//! the best file(s) out of each cluster ([`selector`]). [`engine`] wires
//! all five into the end-to-end pipeline.
//!
//! Nothing here performs file I/O or media decoding; those are external
//! collaborators (`mediasort-app`) reached only through trait seams
//! ([`vptree::Metric`], [`dbscan::PairValidator`], [`selector::DedupEngine`]).

pub mod collaborators;
pub mod dbscan;
pub mod engine;
pub mod frame_hasher;
pub mod selector;
pub mod similarity;
pub mod vptree;

pub use collaborators::{fingerprint_media, FileStatSupplier, FrameSupplier, MetadataSupplier};
pub use dbscan::{Cluster, PairValidator};
pub use engine::{DeduplicationResult, DuplicateSet, Engine};
pub use frame_hasher::hash_frame;
pub use selector::{select, DedupEngine, Selection};
pub use similarity::{adaptive_threshold, media_kind, similarity, MediaKind};
pub use vptree::{Hit, Metric, SearchOptions, VpTree};
