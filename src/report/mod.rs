//! Report rendering.

pub mod generator;

pub use generator::{
    generate_json, generate_markdown_answer, generate_markdown_report, RenderOptions,
};
