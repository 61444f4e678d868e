// SPDX-License-Identifier: MIT OR Apache-2.0
//! Episode template model and compiler.
//!
//! A template is a named, fixed step graph mirroring one of the legal
//! FSM paths. Compiling binds a template to a concrete context —
//! stakes, budgets, tool availability — producing a [`CompiledEpisode`]
//! the runner can walk, or refusing when the context violates the
//! template's declared constraints.

pub mod compile;
pub mod compiled;
pub mod model;
pub mod templates;

pub use compile::{compile, CompilationContext};
pub use compiled::CompiledEpisode;
pub use model::{EpisodeTemplate, TemplateConstraints, TemplateStep};
pub use templates::{all_templates, by_name};
