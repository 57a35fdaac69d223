use crate::model::Transaction;
use serde::{Deserialize, Serialize};

/// The write operation an outbox entry replays.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxAction {
    Create,
    Update,
    Delete,
}

serde_plain::derive_display_from_serialize!(OutboxAction);
serde_plain::derive_fromstr_from_deserialize!(OutboxAction);

/// A write that failed against the remote and is waiting to be replayed.
///
/// `id` is the transaction id the entry concerns. For a create it is the negative placeholder id
/// standing in for the id the remote will eventually assign.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub id: i64,
    pub action: OutboxAction,
    pub transaction: Transaction,
}

impl OutboxEntry {
    pub fn new(action: OutboxAction, transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            action,
            transaction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::sample_transaction;

    #[test]
    fn test_entry_json_layout() {
        let entry = OutboxEntry::new(OutboxAction::Create, sample_transaction(-7, "200"));
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["id"], -7);
        assert_eq!(v["action"], "create");
        assert_eq!(v["transaction"]["amount"], "200");
        let back: OutboxEntry = serde_json::from_value(v).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!("upsert".parse::<OutboxAction>().is_err());
        assert_eq!("delete".parse::<OutboxAction>().unwrap(), OutboxAction::Delete);
    }
}
