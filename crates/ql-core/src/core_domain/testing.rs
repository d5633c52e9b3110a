//! Scripted capability fakes shared by the orchestration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::core::{
    Clock, Generation, GenerationError, GenerationMetadata, Generator, PortFuture, ReviewError,
    ReviewVerdict, Reviewer, Style,
};

#[derive(Clone, Debug, PartialEq)]
pub enum GeneratorCall {
    Write {
        content: String,
        style: String,
    },
    Edit {
        content: String,
        quality: f64,
        human_feedback: Option<String>,
    },
}

/// Generator whose output records the call: `write[style](content)` for
/// writes and `edit#n` for the n-th edit.
#[derive(Default)]
pub struct ScriptedGenerator {
    calls: Mutex<Vec<GeneratorCall>>,
    fail_on_call: Option<usize>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the given 1-based call with a connection error.
    pub fn failing_on(call: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on_call: Some(call),
        }
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GeneratorCall) -> Result<usize, GenerationError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        let n = calls.len();
        if self.fail_on_call == Some(n) {
            return Err(GenerationError::Connection("scripted failure".to_owned()));
        }
        Ok(n)
    }
}

fn generation(text: String) -> Generation {
    Generation {
        text,
        metadata: GenerationMetadata {
            model: "scripted".to_owned(),
            temperature: Some(0.7),
            processing_ms: 1,
        },
    }
}

impl Generator for ScriptedGenerator {
    fn write<'a>(
        &'a self,
        content: &'a str,
        style: &'a Style,
    ) -> PortFuture<'a, Result<Generation, GenerationError>> {
        Box::pin(async move {
            self.record(GeneratorCall::Write {
                content: content.to_owned(),
                style: style.to_string(),
            })?;
            Ok(generation(format!("write[{style}]({content})")))
        })
    }

    fn edit<'a>(
        &'a self,
        content: &'a str,
        review: &'a ReviewVerdict,
        human_feedback: Option<&'a str>,
    ) -> PortFuture<'a, Result<Generation, GenerationError>> {
        Box::pin(async move {
            self.record(GeneratorCall::Edit {
                content: content.to_owned(),
                quality: review.quality_score,
                human_feedback: human_feedback.map(str::to_owned),
            })?;
            let edits = self
                .calls()
                .iter()
                .filter(|c| matches!(c, GeneratorCall::Edit { .. }))
                .count();
            Ok(generation(format!("edit#{edits}")))
        })
    }
}

/// Reviewer that replays a script of results, repeating the last one once
/// the script runs out.
pub struct ScriptedReviewer {
    script: Mutex<VecDeque<Result<ReviewVerdict, String>>>,
    last: Mutex<Option<Result<ReviewVerdict, String>>>,
    reviewed: Mutex<Vec<(String, String)>>,
}

impl ScriptedReviewer {
    pub fn new(script: Vec<Result<ReviewVerdict, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            reviewed: Mutex::new(Vec::new()),
        }
    }

    pub fn always(verdict: ReviewVerdict) -> Self {
        Self::new(vec![Ok(verdict)])
    }

    /// `(original, candidate)` pairs seen so far.
    pub fn reviewed(&self) -> Vec<(String, String)> {
        self.reviewed.lock().unwrap().clone()
    }

    fn next(&self) -> Result<ReviewVerdict, String> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| Err("empty review script".to_owned()))
    }
}

impl Reviewer for ScriptedReviewer {
    fn review<'a>(
        &'a self,
        original: &'a str,
        candidate: &'a str,
    ) -> PortFuture<'a, Result<ReviewVerdict, ReviewError>> {
        Box::pin(async move {
            self.reviewed
                .lock()
                .unwrap()
                .push((original.to_owned(), candidate.to_owned()));
            self.next().map_err(ReviewError::Malformed)
        })
    }
}

pub fn verdict(quality: f64, ready: bool) -> ReviewVerdict {
    ReviewVerdict {
        quality_score: quality,
        clarity_score: quality,
        engagement_score: quality,
        accuracy_score: quality,
        improvements_needed: vec!["more detail".to_owned()],
        ready_for_human: ready,
        overall_feedback: format!("quality {quality}"),
    }
}

/// Clock that reports a fixed elapsed time.
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn elapsed_ms(&self, _since: std::time::Instant) -> u64 {
        self.0
    }
}
