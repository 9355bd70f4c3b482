//! C7: the pipeline driver (§4.7). Threads a stream of documents through
//! every configured transformation, then every configured output, in
//! declared order. Scheduling is single-threaded and sequential (§5); a
//! caller wanting parallelism runs several `Pipeline`s over their own
//! thread pool, since `Document` and `Pass` are `Send`.

use serde_json::Value;

use crate::config::PipelineConfig;
use crate::error::DocScraperError;
use crate::output::OutputSink;
use crate::passes::Transformation;
use crate::query::{project_document, HandWrittenQueryEngine, QueryEngine};
use crate::tree::Document;

pub struct Pipeline {
    transformations: Vec<Transformation>,
    outputs: Vec<Box<dyn OutputSink>>,
    engine: HandWrittenQueryEngine,
    fatal_on_error: bool,
}

impl Pipeline {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, DocScraperError> {
        let transformations = config
            .transformations
            .iter()
            .map(|t| t.compile())
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = config
            .outputs
            .iter()
            .map(|o| o.compile())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            transformations,
            outputs,
            engine: HandWrittenQueryEngine::new(),
            fatal_on_error: config.fatal_on_error,
        })
    }

    /// Run every transformation and every output over one document (§4.6,
    /// §4.7). If no `extract_json` transformation is configured, the
    /// rendered value falls back to the whole-tree projection (§4.6). When
    /// more than one extraction candidate survives, they are collected
    /// into a JSON array rather than emitted as separate records.
    pub fn run_document(&mut self, doc: &mut Document) -> Result<(), DocScraperError> {
        log::debug!("processing document");
        let mut rendered: Option<Value> = None;

        for transformation in &self.transformations {
            match transformation {
                Transformation::Pass(pass) => {
                    log::debug!("applying pass {}", pass.name());
                    pass.apply(doc, &self.engine)?;
                }
                Transformation::Extract(spec) => {
                    let item = project_document(doc);
                    let mut results = spec.evaluate(&self.engine, &item)?;
                    rendered = Some(if results.len() == 1 {
                        results.remove(0)
                    } else {
                        Value::Array(results)
                    });
                }
            }
        }

        let rendered = rendered.unwrap_or_else(|| project_document(doc));
        for sink in &mut self.outputs {
            sink.accept(doc, &rendered)?;
        }
        log::debug!("document emitted");
        Ok(())
    }

    /// Run the whole stream (§4.7): a per-document failure is logged at
    /// `warn` and does not stop the stream, unless `fatal_on_error` is set,
    /// in which case it is logged at `error` and propagated immediately.
    /// Every output's `finish` runs once the stream is exhausted (or on
    /// early exit, so partially-written files are still flushed).
    pub fn run_documents(
        &mut self,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<(), DocScraperError> {
        for mut doc in documents {
            if let Err(e) = self.run_document(&mut doc) {
                if self.fatal_on_error {
                    log::error!("document failed, aborting stream: {e}");
                    let _ = self.finish();
                    return Err(e);
                }
                log::warn!("document failed, continuing with the next: {e}");
            }
        }
        self.finish()
    }

    pub fn finish(&mut self) -> Result<(), DocScraperError> {
        for sink in &mut self.outputs {
            sink.finish()?;
        }
        Ok(())
    }
}
