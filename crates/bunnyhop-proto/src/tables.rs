//! Protocol tables: the `(class_id, method_id) -> name` lookup used for
//! logging and error messages, kept separate from [`crate::methods::Method`]
//! so a log line can name a method even when decoding it failed.

use crate::methods::class::{BASIC, CHANNEL, CONFIRM, CONNECTION, EXCHANGE, QUEUE, TX};

/// Look up the dotted `class.method` name for a `(class_id, method_id)`
/// pair, or `None` if neither is recognized.
#[must_use]
pub fn method_name(class_id: u16, method_id: u16) -> Option<&'static str> {
    Some(match (class_id, method_id) {
        (CONNECTION, 10) => "connection.start",
        (CONNECTION, 11) => "connection.start-ok",
        (CONNECTION, 20) => "connection.secure",
        (CONNECTION, 21) => "connection.secure-ok",
        (CONNECTION, 30) => "connection.tune",
        (CONNECTION, 31) => "connection.tune-ok",
        (CONNECTION, 40) => "connection.open",
        (CONNECTION, 41) => "connection.open-ok",
        (CONNECTION, 50) => "connection.close",
        (CONNECTION, 51) => "connection.close-ok",
        (CONNECTION, 60) => "connection.blocked",
        (CONNECTION, 61) => "connection.unblocked",
        (CONNECTION, 70) => "connection.update-secret",
        (CONNECTION, 71) => "connection.update-secret-ok",
        (CHANNEL, 10) => "channel.open",
        (CHANNEL, 11) => "channel.open-ok",
        (CHANNEL, 20) => "channel.flow",
        (CHANNEL, 21) => "channel.flow-ok",
        (CHANNEL, 40) => "channel.close",
        (CHANNEL, 41) => "channel.close-ok",
        (EXCHANGE, 10) => "exchange.declare",
        (EXCHANGE, 11) => "exchange.declare-ok",
        (EXCHANGE, 20) => "exchange.delete",
        (EXCHANGE, 21) => "exchange.delete-ok",
        (QUEUE, 10) => "queue.declare",
        (QUEUE, 11) => "queue.declare-ok",
        (QUEUE, 20) => "queue.bind",
        (QUEUE, 21) => "queue.bind-ok",
        (QUEUE, 30) => "queue.purge",
        (QUEUE, 31) => "queue.purge-ok",
        (QUEUE, 40) => "queue.delete",
        (QUEUE, 41) => "queue.delete-ok",
        (QUEUE, 50) => "queue.unbind",
        (QUEUE, 51) => "queue.unbind-ok",
        (BASIC, 10) => "basic.qos",
        (BASIC, 11) => "basic.qos-ok",
        (BASIC, 20) => "basic.consume",
        (BASIC, 21) => "basic.consume-ok",
        (BASIC, 30) => "basic.cancel",
        (BASIC, 31) => "basic.cancel-ok",
        (BASIC, 40) => "basic.publish",
        (BASIC, 50) => "basic.return",
        (BASIC, 60) => "basic.deliver",
        (BASIC, 80) => "basic.ack",
        (BASIC, 90) => "basic.reject",
        (BASIC, 100) => "basic.recover-async",
        (BASIC, 110) => "basic.recover",
        (BASIC, 111) => "basic.recover-ok",
        (BASIC, 120) => "basic.nack",
        (CONFIRM, 10) => "confirm.select",
        (CONFIRM, 11) => "confirm.select-ok",
        (TX, 10) => "tx.select",
        (TX, 11) => "tx.select-ok",
        (TX, 20) => "tx.commit",
        (TX, 21) => "tx.commit-ok",
        (TX, 30) => "tx.rollback",
        (TX, 31) => "tx.rollback-ok",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_a_known_method() {
        assert_eq!(method_name(BASIC, 40), Some("basic.publish"));
    }

    #[test]
    fn returns_none_for_an_unknown_pair() {
        assert_eq!(method_name(9999, 1), None);
    }
}
