//! Request Queue
//!
//! FIFO admission for requests sharing one connection. Callers take a ticket
//! and block until it is served; the returned [`Turn`] hands the slot to the
//! next ticket when dropped.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Tickets {
    /// Next ticket to hand out
    next: u64,
    /// Ticket currently allowed to run
    serving: u64,
}

/// Ticket lock serving callers strictly in arrival order
#[derive(Debug, Default)]
pub struct RequestQueue {
    tickets: Mutex<Tickets>,
    turn_changed: Condvar,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every earlier caller has finished, then return the turn
    pub fn wait_turn(&self) -> Turn<'_> {
        let mut tickets = self.tickets.lock();
        let ticket = tickets.next;
        tickets.next = tickets.next.wrapping_add(1);

        while tickets.serving != ticket {
            self.turn_changed.wait(&mut tickets);
        }

        Turn {
            queue: self,
            ticket,
        }
    }

    /// Number of callers holding or waiting for a turn
    pub fn len(&self) -> u64 {
        let tickets = self.tickets.lock();
        tickets.next.wrapping_sub(tickets.serving)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive right to use the connection; released on drop
#[derive(Debug)]
pub struct Turn<'a> {
    queue: &'a RequestQueue,
    ticket: u64,
}

impl Turn<'_> {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let mut tickets = self.queue.tickets.lock();
        tickets.serving = tickets.serving.wrapping_add(1);
        drop(tickets);
        self.queue.turn_changed.notify_all();
    }
}
