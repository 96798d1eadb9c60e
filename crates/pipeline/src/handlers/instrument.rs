use std::time::Instant;

use tracing::{field, info, info_span, warn};

use crate::command::{Command, CommandKind};
use crate::middleware::{Middleware, Next};
use crate::response::{Flow, Reply};

/// Opens a span per command and logs how it finished. Never alters the flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct Instrument;

impl<K: CommandKind> Middleware<K> for Instrument {
    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        let span = info_span!("command", kind = K::KIND, principal = field::Empty);
        let _guard = span.enter();
        let started = Instant::now();

        let flow = next.run(command);

        if let Some(session) = command.session() {
            span.record("principal", field::display(session.principal_id));
        }
        let elapsed_us = started.elapsed().as_micros() as u64;
        match &flow {
            Ok(Reply::Rendered(response)) => {
                info!(status = response.status.code(), elapsed_us, "command finished");
            }
            Ok(Reply::Pending) => info!(executed = command.is_executed(), elapsed_us, "command finished unrendered"),
            Err(failure) => warn!(error = %failure, elapsed_us, "command failed unhandled"),
        }
        flow
    }
}
