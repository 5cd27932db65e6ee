use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue already started; start may only be called once")]
    AlreadyStarted,

    #[error("start requires at least one executor")]
    NoExecutors,

    #[error("start must be called from within a tokio runtime")]
    NoRuntime,

    #[error("work added after finish")]
    Finished,
}

/// A work item panicked while executing.
///
/// Handed to the queue's recovery hook so it can be turned into the caller's
/// own result type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("work item panicked: {message}")]
pub struct WorkPanic {
    message: String,
}

impl WorkPanic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extract a readable message from a panic payload.
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_string(),
                Err(_) => "non-string panic payload".to_string(),
            },
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_from_str_payload() {
        let p = WorkPanic::from_payload(Box::new("boom"));
        assert_eq!(p.message(), "boom");
        assert_eq!(p.to_string(), "work item panicked: boom");
    }

    #[test]
    fn panic_message_from_string_payload() {
        let p = WorkPanic::from_payload(Box::new(format!("code {}", 7)));
        assert_eq!(p.message(), "code 7");
    }

    #[test]
    fn panic_message_from_other_payload() {
        let p = WorkPanic::from_payload(Box::new(42_u32));
        assert_eq!(p.message(), "non-string panic payload");
    }

    #[test]
    fn hook_maps_constructed_panic_into_result() {
        fn hook(panic: WorkPanic) -> Result<u32, String> {
            Err(format!("recovered: {}", panic.message()))
        }

        let panic = WorkPanic::new("boom");
        assert_eq!(panic.to_string(), "work item panicked: boom");
        assert_eq!(hook(panic), Err("recovered: boom".to_string()));
    }
}
