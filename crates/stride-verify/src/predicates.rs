//! Ready-made predicates.
//!
//! Cover the common goal conditions (url shape, element presence, actionable
//! density) so callers only hand-write predicates for domain logic. Each
//! constructor returns an `Arc<dyn Predicate>` ready to drop into a
//! `Verification`.

use std::sync::Arc;

use regex::Regex;
use serde_json::json;
use url::Url;

use crate::context::VerifyContext;
use crate::errors::VerifyError;
use crate::predicate::{Predicate, PredicateOutcome};

pub fn url_equals(expected: impl Into<String>) -> Arc<dyn Predicate> {
    let expected = expected.into();
    Arc::new(move |ctx: &VerifyContext| {
        if ctx.url() == expected {
            PredicateOutcome::pass(format!("url equals {expected:?}"))
        } else {
            PredicateOutcome::fail(format!("url {:?} is not {expected:?}", ctx.url()))
                .with_details(json!({ "url": ctx.url(), "expected": expected }))
        }
    })
}

pub fn url_contains(fragment: impl Into<String>) -> Arc<dyn Predicate> {
    let fragment = fragment.into();
    Arc::new(move |ctx: &VerifyContext| {
        if ctx.url().contains(&fragment) {
            PredicateOutcome::pass(format!("url contains {fragment:?}"))
        } else {
            PredicateOutcome::fail(format!("url {:?} lacks {fragment:?}", ctx.url()))
                .with_details(json!({ "url": ctx.url(), "expected_fragment": fragment }))
        }
    })
}

pub fn url_ends_with(suffix: impl Into<String>) -> Arc<dyn Predicate> {
    let suffix = suffix.into();
    Arc::new(move |ctx: &VerifyContext| {
        if ctx.url().ends_with(&suffix) {
            PredicateOutcome::pass(format!("url ends with {suffix:?}"))
        } else {
            PredicateOutcome::fail(format!("url {:?} does not end with {suffix:?}", ctx.url()))
                .with_details(json!({ "url": ctx.url(), "expected_suffix": suffix }))
        }
    })
}

/// Regex match over the full url. Fails fast on an invalid pattern instead
/// of failing every evaluation at poll time.
pub fn url_matches(pattern: &str) -> Result<Arc<dyn Predicate>, VerifyError> {
    let regex = Regex::new(pattern)?;
    Ok(Arc::new(move |ctx: &VerifyContext| {
        if regex.is_match(ctx.url()) {
            PredicateOutcome::pass(format!("url matches /{}/", regex.as_str()))
        } else {
            PredicateOutcome::fail(format!(
                "url {:?} does not match /{}/",
                ctx.url(),
                regex.as_str()
            ))
            .with_details(json!({ "url": ctx.url(), "pattern": regex.as_str() }))
        }
    }))
}

pub fn host_is(expected: impl Into<String>) -> Arc<dyn Predicate> {
    let expected = expected.into();
    Arc::new(move |ctx: &VerifyContext| match Url::parse(ctx.url()) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if host == expected => {
                PredicateOutcome::pass(format!("host is {expected:?}"))
            }
            other => PredicateOutcome::fail(format!("host {other:?} is not {expected:?}"))
                .with_details(json!({ "url": ctx.url(), "expected_host": expected })),
        },
        Err(err) => PredicateOutcome::fail(format!("url {:?} unparseable: {err}", ctx.url())),
    })
}

pub fn element_text_contains(needle: impl Into<String>) -> Arc<dyn Predicate> {
    let needle = needle.into();
    Arc::new(move |ctx: &VerifyContext| {
        match ctx.elements().iter().find(|e| e.text.contains(&needle)) {
            Some(found) => PredicateOutcome::pass(format!("element {} contains text", found.id))
                .with_details(json!({ "element_id": found.id, "needle": needle })),
            None => PredicateOutcome::fail(format!("no element text contains {needle:?}"))
                .with_details(json!({ "needle": needle, "elements": ctx.elements().len() })),
        }
    })
}

pub fn has_role(role: impl Into<String>) -> Arc<dyn Predicate> {
    let role = role.into();
    Arc::new(move |ctx: &VerifyContext| {
        match ctx.elements().iter().find(|e| e.role == role) {
            Some(found) => PredicateOutcome::pass(format!("element {} has role {role:?}", found.id)),
            None => PredicateOutcome::fail(format!("no element with role {role:?}")),
        }
    })
}

pub fn min_actionable_elements(minimum: usize) -> Arc<dyn Predicate> {
    Arc::new(move |ctx: &VerifyContext| {
        let count = ctx.elements().iter().filter(|e| e.is_actionable()).count();
        if count >= minimum {
            PredicateOutcome::pass(format!("{count} actionable elements (needed {minimum})"))
        } else {
            PredicateOutcome::fail(format!(
                "only {count} actionable elements (needed {minimum})"
            ))
            .with_details(json!({ "actionable": count, "minimum": minimum }))
        }
    })
}

/// Unconditional pass, for wiring and budget tests.
pub fn always_pass() -> Arc<dyn Predicate> {
    Arc::new(|_: &VerifyContext| PredicateOutcome::pass("always passes"))
}

/// Unconditional failure with a fixed reason.
pub fn always_fail(reason: impl Into<String>) -> Arc<dyn Predicate> {
    let reason = reason.into();
    Arc::new(move |_: &VerifyContext| PredicateOutcome::fail(reason.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_snapshot::{Element, Snapshot};

    fn ctx(url: &str, elements: Vec<Element>) -> VerifyContext {
        VerifyContext::from_snapshot(Snapshot::success(url, elements))
    }

    #[test]
    fn url_predicates() {
        let done = ctx("https://app.test/flow/done", vec![]);
        let start = ctx("https://app.test/flow/start", vec![]);

        assert!(url_ends_with("/done").evaluate(&done).passed);
        assert!(!url_ends_with("/done").evaluate(&start).passed);
        assert!(url_contains("/flow/").evaluate(&start).passed);
        assert!(url_equals("https://app.test/flow/done").evaluate(&done).passed);
    }

    #[test]
    fn url_matches_compiles_and_evaluates() {
        let predicate = url_matches(r"/flow/(done|start)$").unwrap();
        assert!(predicate.evaluate(&ctx("https://app.test/flow/done", vec![])).passed);
        assert!(!predicate.evaluate(&ctx("https://app.test/flow/mid", vec![])).passed);
        assert!(url_matches("([unclosed").is_err());
    }

    #[test]
    fn host_predicate_handles_bad_urls() {
        assert!(host_is("app.test").evaluate(&ctx("https://app.test/x", vec![])).passed);
        let outcome = host_is("app.test").evaluate(&ctx("not a url", vec![]));
        assert!(!outcome.passed);
        assert!(outcome.reason.contains("unparseable"));
    }

    #[test]
    fn element_predicates() {
        let page = ctx(
            "https://app.test",
            vec![
                Element::new(1, "button", "Submit order"),
                Element::new(2, "text", "Thanks!"),
            ],
        );
        assert!(element_text_contains("order").evaluate(&page).passed);
        assert!(!element_text_contains("cancel").evaluate(&page).passed);
        assert!(has_role("button").evaluate(&page).passed);
        assert!(min_actionable_elements(1).evaluate(&page).passed);
        assert!(!min_actionable_elements(2).evaluate(&page).passed);
    }

    #[test]
    fn fixtures() {
        let page = ctx("https://app.test", vec![]);
        assert!(always_pass().evaluate(&page).passed);
        let outcome = always_fail("nope").evaluate(&page);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "nope");
    }
}
