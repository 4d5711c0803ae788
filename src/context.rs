//! Request-scoped context carried through one run

use crate::error::Result;
use crate::logging::Logger;
use crate::telemetry::{finish_span, Telemetry};
use opentelemetry::Context;

/// Logger and active span, passed explicitly down the call chain
#[derive(Clone, Debug)]
pub struct RunContext {
    logger: Logger,
    otel: Context,
}

impl RunContext {
    /// Root context with no active span
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            otel: Context::new(),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// OpenTelemetry context holding the active span
    pub fn otel(&self) -> &Context {
        &self.otel
    }

    /// Context for a child span `name` of the current span
    pub fn child(&self, telemetry: &Telemetry, name: &'static str) -> RunContext {
        Self {
            logger: self.logger.clone(),
            otel: telemetry.start_span(name, &self.otel),
        }
    }

    /// End the span this context opened, recording a failure if any
    pub fn finish<T>(&self, result: &Result<T>) {
        finish_span(&self.otel, result);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Logger::stdout(crate::SERVICE_NAME))
    }
}
