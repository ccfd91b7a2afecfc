use crate::modules::classifier::{decide, Classifier, Verdict};
use crate::modules::error::{code::ErrorCode, SpamWardenResult};
use crate::raise_error;
use std::collections::HashMap;
use std::sync::Mutex;

/// Answers from a table keyed by message bytes. Unknown messages fail.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    answers: HashMap<Vec<u8>, Result<Verdict, ErrorCode>>,
    calls: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, raw: &[u8], signalled_spam: bool, score: f64, threshold: f64) -> Self {
        self.answers
            .insert(raw.to_vec(), Ok(decide(signalled_spam, score, threshold)));
        self
    }

    pub fn with_failure(mut self, raw: &[u8], code: ErrorCode) -> Self {
        self.answers.insert(raw.to_vec(), Err(code));
        self
    }

    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Classifier for ScriptedClassifier {
    async fn classify(&self, raw: &[u8]) -> SpamWardenResult<Verdict> {
        self.calls.lock().unwrap().push(raw.to_vec());
        match self.answers.get(raw) {
            Some(Ok(verdict)) => Ok(*verdict),
            Some(Err(code)) => Err(raise_error!("scripted failure".into(), *code)),
            None => Err(raise_error!(
                "no scripted answer".into(),
                ErrorCode::ClassifierFailed
            )),
        }
    }
}
