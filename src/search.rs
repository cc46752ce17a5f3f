use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::{Language, Template};

fn contains(haystack: &str, needle: &str) -> bool {
    !haystack.is_empty() && haystack.to_lowercase().contains(needle)
}

/// Case-insensitive substring match against title, both descriptions, tags and
/// both prompts. `needle` must already be lower-cased.
pub fn matches(template: &Template, needle: &str) -> bool {
    contains(&template.title, needle)
        || [Language::Zh, Language::En].into_iter().any(|lang| {
            template
                .description
                .get(lang)
                .is_some_and(|d| contains(d, needle))
                || template.prompt.get(lang).is_some_and(|p| contains(p, needle))
        })
        || template.tags.iter().any(|tag| contains(tag, needle))
}

/// Filters the given cached lists in order, keeping the first occurrence of
/// each canonical id. Returns `None` for a blank keyword; any other keyword
/// is matched as typed, surrounding whitespace included.
pub fn search_loaded<'a, I>(lists: I, keyword: &str) -> Option<Vec<Template>>
where
    I: IntoIterator<Item = &'a [Template]>,
{
    if keyword.trim().is_empty() {
        return None;
    }
    let needle = keyword.to_lowercase();

    let mut seen = HashSet::new();
    let results = lists
        .into_iter()
        .flatten()
        .filter(|t| matches(t, &needle))
        .filter(|t| seen.insert(t.id.clone()))
        .cloned()
        .collect();
    Some(results)
}

/// Single-flight delayed invocation for search-as-you-type.
///
/// Scheduling a task aborts the one still waiting, so only the last keystroke
/// within the delay window runs.
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalizedText;
    use crate::testing::template;
    use tokio::sync::mpsc;

    #[test]
    fn matching_is_case_insensitive_across_fields() {
        let mut t = template("1", "Portrait", "1");
        t.description = LocalizedText::new("人像摄影", "Studio lighting");
        t.prompt = LocalizedText::new("", "A CINEMATIC shot");
        t.tags = vec!["Retro".into()];

        for needle in ["portrait", "studio", "人像", "cinematic", "retro"] {
            assert!(matches(&t, needle), "{needle} should match");
        }
        assert!(!matches(&t, "logo"));
    }

    #[test]
    fn blank_keyword_is_not_a_search() {
        let list = vec![template("1", "Portrait", "1")];
        assert!(search_loaded([list.as_slice()], "   ").is_none());
    }

    #[test]
    fn trailing_whitespace_is_part_of_the_keyword() {
        let mut list = vec![template("1", "Portrait", "1"), template("2", "portrait shot", "1")];
        for t in &mut list {
            t.prompt = LocalizedText::default();
        }
        let found = search_loaded([list.as_slice()], "portrait ").expect("search");
        let ids: Vec<_> = found.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn results_keep_source_order_and_drop_duplicates() {
        let a = vec![
            template("1", "Portrait one", "a"),
            template("2", "Logo", "a"),
            template("3", "Portrait three", "a"),
        ];
        let b = vec![template("3", "Portrait three", "b"), template("4", "Portrait four", "b")];

        let found = search_loaded([a.as_slice(), b.as_slice()], "PORTRAIT").expect("search");
        let ids: Vec<_> = found.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
        assert_eq!(found[1].category, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_scheduled_search_runs() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for keyword in ["p", "po", "por"] {
            let tx = tx.clone();
            debouncer.schedule(async move {
                let _ = tx.send(keyword);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rx.recv().await, Some("por"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_search() {
        let (tx, mut rx) = mpsc::unbounded_channel::<&str>();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(async move {
            let _ = tx.send("late");
        });
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.recv().await.is_none());
    }
}
