use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_TOASTS: usize = 5;
pub const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: Kind,
    created: Instant,
}

/// Short-lived notifications, oldest first.
#[derive(Debug, Default)]
pub struct Toasts {
    entries: VecDeque<Toast>,
}

impl Toasts {
    pub fn success<T: Into<String>>(&mut self, text: T) {
        self.push(Kind::Success, text, Instant::now());
    }

    pub fn error<T: Into<String>>(&mut self, text: T) {
        let text = text.into();
        tracing::error!("{}", text);
        self.push(Kind::Error, text, Instant::now());
    }

    pub fn info<T: Into<String>>(&mut self, text: T) {
        self.push(Kind::Info, text, Instant::now());
    }

    pub fn push<T: Into<String>>(&mut self, kind: Kind, text: T, now: Instant) {
        if self.entries.len() >= MAX_TOASTS {
            self.entries.pop_front();
        }
        self.entries.push_back(Toast {
            text: text.into(),
            kind,
            created: now,
        });
    }

    /// Drop toasts older than [`TOAST_TTL`].
    pub fn expire(&mut self, now: Instant) {
        self.entries
            .retain(|toast| now.saturating_duration_since(toast.created) < TOAST_TTL);
    }

    pub fn dismiss(&mut self, index: usize) {
        self.entries.remove(index);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_to_five() {
        let mut toasts = Toasts::default();
        let now = Instant::now();
        for i in 0..7 {
            toasts.push(Kind::Info, format!("toast {}", i), now);
        }
        assert_eq!(toasts.len(), 5);
        assert_eq!(toasts.iter().next().unwrap().text, "toast 2");
    }

    #[test]
    fn test_expire_after_ttl() {
        let mut toasts = Toasts::default();
        let start = Instant::now();
        toasts.push(Kind::Success, "old", start);
        toasts.push(Kind::Error, "new", start + Duration::from_secs(3));

        toasts.expire(start + Duration::from_secs(2));
        assert_eq!(toasts.len(), 2);

        toasts.expire(start + TOAST_TTL);
        let left: Vec<&str> = toasts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(left, vec!["new"]);
    }

    #[test]
    fn test_dismiss() {
        let mut toasts = Toasts::default();
        toasts.info("a");
        toasts.success("b");
        toasts.dismiss(0);
        assert_eq!(toasts.iter().next().unwrap().kind, Kind::Success);
        toasts.dismiss(5);
        assert_eq!(toasts.len(), 1);
    }
}
