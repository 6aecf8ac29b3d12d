use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::entities::CachedPhotoEntry;
use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;

/// リモート取得 + ローカル保存の結果。`None` は写真が存在しないことを表す
pub type RefreshOutcome = Result<Option<CachedPhotoEntry>, AppError>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct PendingRefresh {
    ticket: u64,
    future: SharedRefresh,
}

/// ユーザー単位で実行中のリフレッシュを共有するレジストリ
///
/// 同じユーザーへの重複した `load` は、先行するリクエストの完了を待って同じ結果を受け取る。
/// 複数のキャッシュインスタンスで共有できるよう `Clone` は内部状態を共有する。
#[derive(Clone, Default)]
pub struct InFlightLoads {
    pending: Arc<Mutex<HashMap<String, PendingRefresh>>>,
    next_ticket: Arc<AtomicU64>,
}

impl InFlightLoads {
    pub fn new() -> Self {
        Self::default()
    }

    /// 実行中のリフレッシュがあれば合流し、無ければ `start` で開始する
    ///
    /// `start` には発行されたチケットが渡される。開始されたフューチャーは
    /// 書き込み前に `run_if_current` でチケットがまだ有効か確認すること。
    pub async fn join_or_start<F>(&self, user: &UserId, start: F) -> RefreshOutcome
    where
        F: FnOnce(u64) -> BoxFuture<'static, RefreshOutcome>,
    {
        let (ticket, future) = {
            let mut pending = self.pending.lock().await;
            match pending.get(user.as_str()) {
                Some(existing) => {
                    debug!(user = %user, ticket = existing.ticket, "joining in-flight photo refresh");
                    (existing.ticket, existing.future.clone())
                }
                None => {
                    let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
                    let future = start(ticket).shared();
                    pending.insert(
                        user.as_str().to_string(),
                        PendingRefresh {
                            ticket,
                            future: future.clone(),
                        },
                    );
                    (ticket, future)
                }
            }
        };

        let outcome = future.await;

        let mut pending = self.pending.lock().await;
        if pending
            .get(user.as_str())
            .is_some_and(|entry| entry.ticket == ticket)
        {
            pending.remove(user.as_str());
        }

        outcome
    }

    /// チケットがまだ最新の場合のみ `work` を実行する
    ///
    /// 実行中はレジストリのロックを保持するため、`invalidate` や新しいリフレッシュの登録は
    /// `work` の完了後に行われる。
    pub async fn run_if_current<Fut, T>(&self, user: &UserId, ticket: u64, work: Fut) -> Option<T>
    where
        Fut: Future<Output = T>,
    {
        let pending = self.pending.lock().await;
        let is_current = pending
            .get(user.as_str())
            .is_some_and(|entry| entry.ticket == ticket);
        if !is_current {
            return None;
        }
        Some(work.await)
    }

    /// 実行中のリフレッシュを切り離す。切り離されたリフレッシュは結果を保存しない
    pub async fn invalidate(&self, user: &UserId) {
        let mut pending = self.pending.lock().await;
        if let Some(entry) = pending.remove(user.as_str()) {
            debug!(user = %user, ticket = entry.ticket, "detached in-flight photo refresh");
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
