use std::fmt::Write as _;

use async_trait::async_trait;

use crate::metric::MetricRecord;

/// Reporters take the collector's accumulated records and send them somewhere:
/// stdout, a file, a telemetry pipeline. Invoked once, at the end of a run.
#[async_trait]
pub trait Reporter {
    async fn report(&self, records: &[MetricRecord]) -> Result<(), Box<dyn std::error::Error>>;
}

/// Human-readable report, one line per record.
pub struct StdoutReporter;

impl StdoutReporter {
    fn render(records: &[MetricRecord]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "collected metrics: {} records", records.len());
        for record in records {
            match record.status {
                Some(code) => {
                    let _ = writeln!(
                        out,
                        "{}/{} -> {} in {:?}",
                        record.state, record.task, code, record.elapsed
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{}/{} -> failed in {:?} ({})",
                        record.state,
                        record.task,
                        record.elapsed,
                        record.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
        out
    }
}

#[async_trait]
impl Reporter for StdoutReporter {
    async fn report(&self, records: &[MetricRecord]) -> Result<(), Box<dyn std::error::Error>> {
        print!("{}", Self::render(records));
        Ok(())
    }
}

/// Machine-readable report: the record batch as a JSON array on stdout.
pub struct JsonReporter;

#[async_trait]
impl Reporter for JsonReporter {
    async fn report(&self, records: &[MetricRecord]) -> Result<(), Box<dyn std::error::Error>> {
        let value = serde_json::to_string(records)?;
        println!("{value}");
        Ok(())
    }
}
