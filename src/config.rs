use crate::error::{Error, Result};
use crate::executor::PanicStrategy;

/// Tie-break used when both new routines and ready pending routines exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Always start new routines first. Pending routines can starve under a
    /// steady stream of submissions; watch `deferred_resumes` in the metrics.
    #[default]
    PreferNew,
    /// Alternate between starting a new routine and resuming a pending one.
    Interleave,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub num_workers: Option<usize>,
    pub scheduler_threads: usize,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
    pub resume_policy: ResumePolicy,
    pub panic_strategy: PanicStrategy,
    pub record_trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: None,
            scheduler_threads: 1,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "tandem".to_string(),
            resume_policy: ResumePolicy::default(),
            panic_strategy: PanicStrategy::default(),
            record_trace: false,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_workers {
            if n == 0 {
                return Err(Error::config("num_workers must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_workers too large (max 1024)"));
            }
        }

        if self.scheduler_threads == 0 {
            return Err(Error::config("scheduler_threads must be > 0"));
        }
        if self.scheduler_threads > 64 {
            return Err(Error::config("scheduler_threads too large (max 64)"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_workers.unwrap_or_else(num_cpus::get)
    }

    pub(crate) fn thread_builder(&self, role: &str, id: usize) -> std::thread::Builder {
        let mut builder =
            std::thread::Builder::new().name(format!("{}-{}-{}", self.thread_name_prefix, role, id));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.config.num_workers = Some(n);
        self
    }

    pub fn scheduler_threads(mut self, n: usize) -> Self {
        self.config.scheduler_threads = n;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.config.resume_policy = policy;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn record_trace(mut self, enable: bool) -> Self {
        self.config.record_trace = enable;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
