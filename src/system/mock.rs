//! Mock system implementation for testing

#![expect(clippy::module_name_repetitions)]

use super::System;
use std::collections::{HashMap, VecDeque};
use std::env::VarError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// In-memory implementation of System trait for testing
///
/// `MockSystem` provides an in-memory filesystem, environment and prompt
/// queue, perfect for fast, isolated unit tests without side effects.
///
/// # Example
/// ```
/// use devrig::system::{mock::MockSystem, System};
/// use std::path::Path;
///
/// let system = MockSystem::new()
///     .with_env("HOME", "/home/user")
///     .with_file("/test/devrig.yaml", b"name: test");
///
/// assert_eq!(system.env_var("HOME").unwrap(), "/home/user");
/// assert!(system.is_file(Path::new("/test/devrig.yaml")));
/// ```
#[derive(Clone)]
pub struct MockSystem {
    state: Arc<RwLock<MockSystemState>>,
}

struct MockSystemState {
    env_vars: HashMap<String, String>,
    files: HashMap<PathBuf, Vec<u8>>,
    prompt_answers: VecDeque<String>,
    prompts_asked: Vec<String>,
}

impl MockSystem {
    /// Create a new `MockSystem` with default state
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockSystemState {
                env_vars: HashMap::new(),
                files: HashMap::new(),
                prompt_answers: VecDeque::new(),
                prompts_asked: Vec::new(),
            })),
        }
    }

    /// Set an environment variable (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_env(self, key: &str, value: &str) -> Self {
        {
            let mut state = self.state.write().expect("mock state poisoned");
            state.env_vars.insert(key.to_owned(), value.to_owned());
        }
        self
    }

    /// Add a file with contents (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> Self {
        {
            let mut state = self.state.write().expect("mock state poisoned");
            state
                .files
                .insert(path.as_ref().to_path_buf(), contents.to_vec());
        }
        self
    }

    /// Queue an answer for the next prompt (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_prompt_answer(self, answer: &str) -> Self {
        {
            let mut state = self.state.write().expect("mock state poisoned");
            state.prompt_answers.push_back(answer.to_owned());
        }
        self
    }

    /// All questions that were asked through `prompt` so far
    #[must_use]
    #[inline]
    pub fn prompts_asked(&self) -> Vec<String> {
        let state = self.state.read().expect("mock state poisoned");
        state.prompts_asked.clone()
    }
}

impl Default for MockSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl System for MockSystem {
    #[inline]
    #[expect(clippy::map_err_ignore, reason = "This is for VarError")]
    fn env_var(&self, key: &str) -> Result<String, VarError> {
        let state = self.state.read().map_err(|_| VarError::NotPresent)?;
        state.env_vars.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[inline]
    fn env_vars(&self) -> Vec<(String, String)> {
        let state = self.state.read().expect("mock state poisoned");
        state
            .env_vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let state = self
            .state
            .read()
            .map_err(|e| io::Error::other(e.to_string()))?;
        let contents = state.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )
        })?;
        String::from_utf8(contents.clone()).map_err(io::Error::other)
    }

    #[inline]
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    #[inline]
    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        // directories are implicit in the path-keyed file map
        Ok(())
    }

    #[inline]
    fn is_file(&self, path: &Path) -> bool {
        let Ok(state) = self.state.read() else {
            return false;
        };
        state.files.contains_key(path)
    }

    #[inline]
    fn prompt(&self, question: &str) -> io::Result<String> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        state.prompts_asked.push(question.to_owned());
        state.prompt_answers.pop_front().ok_or_else(|| {
            io::Error::other(format!("No mock answer queued for prompt: {question}"))
        })
    }
}
