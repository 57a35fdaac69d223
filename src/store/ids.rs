use crate::error::Res;
use crate::store::{LocalStore, OutboxStore};

/// Hands out negative placeholder ids for transactions created while offline.
///
/// The first allocation scans the mirror and the outbox for the smallest id in use. Every id
/// returned afterwards is strictly below anything seen, so placeholders never collide with each
/// other or with server ids.
#[derive(Debug, Default)]
pub(crate) struct PlaceholderIds {
    last: Option<i64>,
}

impl PlaceholderIds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn allocate(
        &mut self,
        local: &dyn LocalStore,
        outbox: &dyn OutboxStore,
    ) -> Res<i64> {
        let last = match self.last {
            Some(last) => last,
            None => {
                let mirror_min = local.get_all().await?.iter().map(|t| t.id).min();
                let outbox_min = outbox.get_all().await?.iter().map(|e| e.id).min();
                [mirror_min, outbox_min]
                    .into_iter()
                    .flatten()
                    .fold(0, i64::min)
            }
        };
        let next = last - 1;
        self.last = Some(next);
        Ok(next)
    }
}
