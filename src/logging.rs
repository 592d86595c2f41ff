//! Log sink for surfaced failures.
//!
//! Every surfaced failure in the crate also lands here as a human-readable
//! message. The sink can be paused: while paused, messages pile up on a
//! stack instead of reaching the handler, and the next flush joins them into
//! a single causation chain, most recent first:
//!
//! ```text
//! replace : could not replace!
//! Due to
//!     search : str not found!
//! ```
//!
//! Pausing is how nested compilation reports one outer diagnostic with the
//! inner lexer/resolver messages chained underneath instead of spraying them
//! at the handler one by one.
//!
//! The whole store runs under a single logical thread of control, so the
//! sink state lives in a thread local. Install a handler from the thread
//! that drives the tables.

use std::cell::RefCell;

type LogHandler = Box<dyn Fn(&str)>;

struct LogState {
    paused: bool,
    pending: Vec<String>,
    handler: LogHandler,
}

thread_local! {
    static LOG: RefCell<LogState> = RefCell::new(LogState {
        paused: false,
        pending: Vec::new(),
        handler: Box::new(|msg| eprintln!("{msg}")),
    });
}

/// Joins the pending stack (most recent first) into one causation chain.
fn drain_chain(pending: &mut Vec<String>, mut message: String) -> String {
    message.push('\n');
    let mut level = 1usize;
    while let Some(older) = pending.pop() {
        for _ in 1..level {
            message.push('\t');
        }
        message.push_str("Due to\n");
        let indent = "\t".repeat(level);
        message.push_str(&indent);
        message.push_str(&older.replace('\n', &format!("\n{indent}")));
        message.push('\n');
        level += 1;
    }
    message
}

/// Installs `handler` as the sink for flushed messages, replacing the
/// default stderr writer.
pub fn set_log_handler(handler: impl Fn(&str) + 'static) {
    LOG.with(|log| log.borrow_mut().handler = Box::new(handler));
}

/// Queues or delivers a message. While the sink is paused the message is
/// pushed onto the pending stack; otherwise it is flushed immediately with
/// any pending messages chained underneath.
pub fn add_log_msg(message: impl Into<String>) {
    let message = message.into();
    LOG.with(|log| {
        let mut st = log.borrow_mut();
        if st.paused {
            st.pending.push(message);
        } else {
            let chained = drain_chain(&mut st.pending, message);
            (st.handler)(&chained);
        }
    });
}

/// Formats `"<Category> Issue : <detail>"` and queues or delivers it.
pub(crate) fn report(category: &str, detail: impl Into<String>) {
    add_log_msg(format!("{category} Issue : {}", detail.into()));
}

/// Stops messages from reaching the handler; they stack up instead.
pub fn pause_log_handler() {
    LOG.with(|log| log.borrow_mut().paused = true);
}

/// Lets messages reach the handler again. Does not flush by itself; call
/// [`handle_unhandled`] or add another message to drain the stack.
pub fn resume_log_handler() {
    LOG.with(|log| log.borrow_mut().paused = false);
}

pub fn is_log_handler_paused() -> bool {
    LOG.with(|log| log.borrow().paused)
}

/// Flushes the pending stack as one causation chain, if the sink is running
/// and anything is pending.
pub fn handle_unhandled() {
    LOG.with(|log| {
        let mut st = log.borrow_mut();
        if !st.paused {
            if let Some(top) = st.pending.pop() {
                let chained = drain_chain(&mut st.pending, top);
                (st.handler)(&chained);
            }
        }
    });
}

/// Most recent unhandled message, or empty when nothing is pending.
pub fn recent_log() -> String {
    LOG.with(|log| log.borrow().pending.last().cloned().unwrap_or_default())
}

/// Pauses the sink for the lifetime of the guard, restoring the previous
/// state on drop. An already-paused sink is left paused.
pub(crate) struct LogPause {
    was_paused: bool,
}

impl LogPause {
    pub(crate) fn new() -> Self {
        let was_paused = is_log_handler_paused();
        if !was_paused {
            pause_log_handler();
        }
        LogPause { was_paused }
    }

    /// Resumes early, unless the sink was paused before this guard existed.
    pub(crate) fn resume(&self) {
        if !self.was_paused {
            resume_log_handler();
        }
    }
}

impl Drop for LogPause {
    fn drop(&mut self) {
        if self.was_paused {
            pause_log_handler();
        } else {
            resume_log_handler();
        }
    }
}
