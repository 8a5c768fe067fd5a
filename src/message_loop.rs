/*
 * The message pump. Fetches from the calling thread's queue, gives the
 * optional accelerator table the first look at each message (a match consumes
 * it), and hands everything else to the windowing system for dispatch, which
 * lands in `Dispatcher::dispatch` for intercepted handles. Returns the exit
 * code carried by the quit message.
 *
 * The loop owns no window state; handlers may freely create or destroy windows
 * while it runs.
 */
use crate::dispatch::Dispatcher;
use crate::types::{AccelTable, PumpMessage};

use std::rc::Rc;

pub fn run_message_loop(dispatcher: &Dispatcher, accel: Option<AccelTable>) -> i32 {
    let host = Rc::clone(dispatcher.host());
    log::debug!("MessageLoop: entering (accelerators: {})", accel.is_some());
    let mut dispatched: usize = 0;
    loop {
        match host.next_message() {
            PumpMessage::Quit(exit_code) => {
                log::debug!(
                    "MessageLoop: quit with code {exit_code} after {dispatched} message(s)"
                );
                return exit_code;
            }
            PumpMessage::Message(msg) => {
                if let Some(table) = accel
                    && host.translate_accelerator(table, &msg)
                {
                    log::trace!("MessageLoop: {:#06x} consumed by accelerator", msg.msg);
                    continue;
                }
                host.dispatch_message(&msg);
                dispatched += 1;
            }
        }
    }
}
