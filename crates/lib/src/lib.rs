//! stratum-lib: the profile generation and manifest transaction engine.
//!
//! This crate provides the fundamental types behind a stratum profile:
//! - `Manifest` / `ManifestEntry`: the declarative list of installed items
//! - `ManifestTransaction`: a composable diff (installs + removal patterns)
//! - `GenerationStore`: immutable, numbered generations behind one mutable pointer
//! - `ProfileLock`: one concurrent mutator per profile
//! - `build_and_publish`: turn a manifest into an atomically published generation
//!
//! The build engine and the package database are external collaborators,
//! reached through the [`build::BuildService`] and [`index::PackageIndex`]
//! traits carried by a per-invocation [`session::Session`].

pub mod build;
pub mod builder;
pub mod gc;
pub mod index;
pub mod manifest;
pub mod ops;
pub mod pattern;
pub mod profile;
pub mod search_path;
pub mod session;
pub mod upgrade;
pub mod version;

#[cfg(test)]
pub(crate) mod testutil;
