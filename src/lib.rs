#![doc = include_str!("../README.md")]
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod error;
pub use error::{ActionError, Owner, Result};

pub mod path;
pub use path::PathFragment;

pub mod artifact;
pub use artifact::{Artifact, ArtifactKind, ArtifactRoot};

pub mod config;
pub use config::FeatureSet;

pub mod context;
pub use context::{CcCompilationContext, DeclaredIncludeDir, HeadersCheckingMode};

pub mod digest;

pub mod depset;
pub use depset::DependencySet;

pub mod discovery;
pub use discovery::HeaderDiscoveryEngine;

pub mod strict_deps;
pub use strict_deps::StrictDepsValidator;

pub mod modules;
pub use modules::{ModuleActionValue, ModuleResolution};

pub mod fingerprint;

pub mod collab;
pub use collab::{
    ActionFilesystem, ArtifactExpander, CommandLineBuilder, DotDFile, EvaluatorHandle, EvaluatorValues,
    ExecutionContext, IncludeScanner, IncludeScanningHeaderData, SpawnExecutor, SpawnResult,
};

pub mod extra_action;
pub use extra_action::ExtraActionInfo;

pub mod action;
pub use action::{ActionCore, CompileAction, DiscoverOutcome, ExecutionState, SpawnOutcome};

pub mod support;
