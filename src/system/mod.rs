//! System abstraction for environment, filesystem and prompt operations
//!
//! This module provides a unified trait for all external system interactions,
//! allowing for easy testing with mock implementations. Configuration
//! resolution only ever touches the outside world through this trait, so the
//! whole resolver pipeline can run against an in-memory filesystem.

use std::env::VarError;
use std::io;
use std::path::Path;

pub mod mock;
pub mod real;

pub use mock::MockSystem;
pub use real::RealSystem;

/// Unified trait for system operations (environment + filesystem + prompts)
///
/// # Implementations
/// - `RealSystem`: Production implementation using `std::env`, `std::fs` and stdin
/// - `MockSystem`: Test implementation using in-memory storage and queued answers
pub trait System: Send + Sync {
    // ==================== Environment Operations ====================

    /// Get an environment variable
    fn env_var(&self, key: &str) -> Result<String, VarError>;

    /// Get all environment variables, used to build child process environments
    fn env_vars(&self) -> Vec<(String, String)>;

    // ==================== Filesystem Operations ====================

    /// Read entire file contents as a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write bytes to a file, creating it if it doesn't exist
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Recursively create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Check if a path points to a file
    fn is_file(&self, path: &Path) -> bool;

    // ==================== Interaction ====================

    /// Ask the user a question and return the entered line
    ///
    /// Used by the variable resolver for `question` variables. Each variable
    /// is asked at most once per session; the answer is cached afterwards.
    fn prompt(&self, question: &str) -> io::Result<String>;
}
