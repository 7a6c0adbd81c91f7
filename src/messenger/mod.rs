//! Message passing between vertices across supersteps.
//!
//! Each partition owns one [`Messenger`]. During superstep `n` vertices read the inbox filled at
//! barrier `n - 1` and write to the outbox of `n`. At barrier `n` the coordinator takes every
//! outbox, routes the messages to the partitions owning their destinations and installs them as
//! the inboxes of `n + 1`.

use crate::computer::partition::Partitioner;
use crate::error::GCError;
use crate::graph::VertexId;
use hashbrown::HashMap;
use std::sync::Arc;

pub type MessageCombiner<M> = Arc<dyn Fn(&M, &M) -> M + Send + Sync>;

pub type Mailbox<M> = HashMap<VertexId, Vec<M>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Message<M> {
    pub destination: VertexId,
    pub payload: M,
    /// Superstep the message was sent in.
    pub superstep: usize,
}

/// Messages sent by one partition during one superstep.
#[derive(Debug)]
pub struct Outbox<M> {
    partition: usize,
    superstep: usize,
    messages: Mailbox<M>,
}

impl<M> Outbox<M> {
    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn superstep(&self) -> usize {
        self.superstep
    }

    pub fn len(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> impl Iterator<Item = Message<M>> {
        let superstep = self.superstep;
        self.messages.into_iter().flat_map(move |(destination, payloads)| {
            payloads.into_iter().map(move |payload| Message { destination, payload, superstep })
        })
    }
}

pub struct Messenger<M> {
    partition: usize,
    superstep: usize,
    inbox: Mailbox<M>,
    outbox: Mailbox<M>,
    combiner: Option<MessageCombiner<M>>,
    sent: usize,
}

impl<M> Messenger<M> {
    pub fn new(partition: usize, combiner: Option<MessageCombiner<M>>) -> Self {
        Self {
            partition,
            superstep: 0,
            inbox: HashMap::new(),
            outbox: HashMap::new(),
            combiner,
            sent: 0,
        }
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn superstep(&self) -> usize {
        self.superstep
    }

    /// Queues `payload` for `destination`, to be delivered in the next superstep. With a
    /// combiner, messages to the same destination are folded into one right away.
    pub fn send_message(&mut self, destination: VertexId, payload: M) {
        self.sent += 1;
        let queued = self.outbox.entry(destination).or_insert_with(Vec::new);
        match (&self.combiner, queued.first_mut()) {
            (Some(combiner), Some(current)) => *current = combiner(&*current, &payload),
            _ => queued.push(payload),
        }
    }

    /// Takes the messages addressed to `vertex_id` in the previous superstep. A second call for
    /// the same vertex returns nothing.
    pub fn receive_messages(&mut self, vertex_id: VertexId) -> Vec<M> {
        self.inbox.remove(&vertex_id).unwrap_or_default()
    }

    pub fn peek_messages(&self, vertex_id: VertexId) -> &[M] {
        self.inbox.get(&vertex_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_incoming(&self) -> bool {
        !self.inbox.is_empty()
    }

    /// Number of `send_message` calls in the current superstep, before combining.
    pub fn sent_count(&self) -> usize {
        self.sent
    }

    pub(crate) fn take_outbox(&mut self) -> Outbox<M> {
        self.sent = 0;
        Outbox {
            partition: self.partition,
            superstep: self.superstep,
            messages: std::mem::take(&mut self.outbox),
        }
    }

    /// Installs the inbox of `superstep`. Anything left unread from the previous inbox is
    /// dropped.
    pub(crate) fn deliver(&mut self, superstep: usize, inbox: Mailbox<M>) {
        self.superstep = superstep;
        self.inbox = inbox;
    }
}

/// Groups all outboxes of `superstep` by the partition owning each destination vertex, combining
/// messages to the same vertex when a combiner is given. Returns one mailbox per partition and
/// the number of messages pending for the next superstep.
pub fn route_messages<M>(
    outboxes: Vec<Outbox<M>>,
    superstep: usize,
    partitioner: &Partitioner,
    combiner: Option<&MessageCombiner<M>>,
) -> Result<(Vec<Mailbox<M>>, usize), GCError> {
    let mut mailboxes = (0..partitioner.partitions()).map(|_| HashMap::new()).collect::<Vec<_>>();
    let mut pending = 0;
    let mut outboxes = outboxes;
    outboxes.sort_by_key(Outbox::partition);
    for outbox in outboxes {
        debug_assert_eq!(outbox.superstep(), superstep);
        for message in outbox.into_messages() {
            let partition = partitioner.partition_of(message.destination).ok_or_else(|| {
                GCError::Generic(format!(
                    "Message from superstep {} addressed to unknown vertex {}",
                    message.superstep, message.destination
                ))
            })?;
            let queued: &mut Vec<M> =
                mailboxes[partition].entry(message.destination).or_insert_with(Vec::new);
            match (combiner, queued.first_mut()) {
                (Some(combiner), Some(current)) => {
                    *current = combiner(&*current, &message.payload);
                }
                _ => {
                    queued.push(message.payload);
                    pending += 1;
                }
            }
        }
    }
    Ok((mailboxes, pending))
}

#[cfg(test)]
mod tests {
    use crate::computer::partition::{PartitionStrategy, Partitioner};
    use crate::memory::combiners;
    use crate::messenger::{route_messages, MessageCombiner, Messenger};
    use std::sync::Arc;

    fn partitioner() -> Partitioner {
        Partitioner::new(PartitionStrategy::Range, 2, 0, 0..4).expect("partitioner")
    }

    #[test]
    fn delivered_in_next_superstep_only() {
        let partitioner = partitioner();
        let mut messengers = vec![Messenger::new(0, None), Messenger::new(1, None)];
        messengers[0].send_message(3, "a");
        messengers[0].send_message(3, "b");
        messengers[1].send_message(0, "c");
        assert_eq!(messengers[0].sent_count(), 2);
        assert!(messengers[1].peek_messages(3).is_empty());

        let outboxes = messengers.iter_mut().map(Messenger::take_outbox).collect();
        let (mailboxes, pending) =
            route_messages(outboxes, 0, &partitioner, None).expect("routing");
        assert_eq!(pending, 3);
        for (messenger, mailbox) in messengers.iter_mut().zip(mailboxes) {
            messenger.deliver(1, mailbox);
        }

        assert_eq!(messengers[1].superstep(), 1);
        assert_eq!(messengers[1].receive_messages(3), vec!["a", "b"]);
        assert!(messengers[1].receive_messages(3).is_empty());
        assert_eq!(messengers[0].peek_messages(0), &["c"]);
        assert!(messengers[0].receive_messages(1).is_empty());

        // Nothing sent in superstep 1, so the unread inbox of vertex 0 is gone in superstep 2.
        let outboxes = messengers.iter_mut().map(Messenger::take_outbox).collect();
        let (mailboxes, pending) =
            route_messages(outboxes, 1, &partitioner, None).expect("routing");
        assert_eq!(pending, 0);
        for (messenger, mailbox) in messengers.iter_mut().zip(mailboxes) {
            messenger.deliver(2, mailbox);
        }
        assert!(!messengers[0].has_incoming());
    }

    #[test]
    fn combined_locally_and_across_partitions() {
        let partitioner = partitioner();
        let combiner: MessageCombiner<i64> = Arc::new(combiners::min::<i64>);
        let mut messengers = vec![
            Messenger::new(0, Some(Arc::clone(&combiner))),
            Messenger::new(1, Some(Arc::clone(&combiner))),
        ];
        messengers[0].send_message(1, 7);
        messengers[0].send_message(1, 4);
        messengers[1].send_message(1, 5);
        messengers[1].send_message(2, 9);

        let outboxes = messengers.iter_mut().map(Messenger::take_outbox).collect::<Vec<_>>();
        assert_eq!(outboxes[0].len(), 1);
        let (mut mailboxes, pending) =
            route_messages(outboxes, 0, &partitioner, Some(&combiner)).expect("routing");
        assert_eq!(pending, 2);
        assert_eq!(mailboxes[0].remove(&1), Some(vec![4]));
        assert_eq!(mailboxes[1].remove(&2), Some(vec![9]));
    }

    #[test]
    fn unknown_destination() {
        let mut messenger = Messenger::new(0, None);
        messenger.send_message(10, ());
        let result = route_messages(vec![messenger.take_outbox()], 0, &partitioner(), None);
        assert!(result.is_err());
    }
}
