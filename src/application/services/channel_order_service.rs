use crate::application::ports::api_client::ChannelApi;
use crate::application::ports::notifier::{Alert, Notifier};
use crate::domain::entities::{AuthUser, Channel, ReorderPhase, reconcile_order};
use crate::domain::value_objects::ChannelId;
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

const REORDER_FAILED_MESSAGE: &str = "An error occurred while reordering channels.";
const REORDER_RETRY_MESSAGE: &str = "Could not save the channel order. Please try again.";
const DELETE_SUCCEEDED_MESSAGE: &str = "The channel has been deleted successfully.";
const DELETE_FAILED_MESSAGE: &str = "An error occurred while deleting a channel.";

/// ドラッグ&ドロップの結果。位置ではなく ID で指定する。
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub moved_id: ChannelId,
    /// ドロップ先の要素。リストの外で離した場合は `None`。
    pub target_id: Option<ChannelId>,
}

impl DropEvent {
    pub fn new(moved_id: impl Into<ChannelId>, target_id: impl Into<ChannelId>) -> Self {
        Self {
            moved_id: moved_id.into(),
            target_id: Some(target_id.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// 並びは変わらない（自分自身へのドロップなど）
    Unchanged,
    /// 権限が無いのでローカルの表示順だけ変えた
    LocalOnly,
    /// サーバーが新しい並びを保存した
    Confirmed,
    /// 保存に失敗し、最後に確定した並びへ戻した
    Reverted,
    /// 保存に失敗したが、後続の並べ替えが既に適用されている
    Superseded,
}

struct OrderState {
    /// サーバーが最後に確定した並び。保存に失敗したらここへ戻す。
    confirmed: Vec<Channel>,
    /// `confirmed` の元になった操作の世代
    confirmed_generation: u64,
    phase: ReorderPhase,
    generation: u64,
    /// 応答待ちの保存リクエスト数
    pending: usize,
}

impl OrderState {
    fn settle_phase(&mut self) {
        self.phase = if self.pending > 0 {
            ReorderPhase::Reordering
        } else {
            ReorderPhase::Stable
        };
    }
}

/// チャンネル一覧の楽観的な並べ替え
///
/// 新しい並びはサーバーの応答を待たずに購読者へ配信し、保存に失敗したら
/// 最後にサーバーが確定した並びへ戻す。
pub struct ChannelOrderService {
    api: Arc<dyn ChannelApi>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<OrderState>,
    items: watch::Sender<Vec<Channel>>,
}

impl ChannelOrderService {
    pub fn new(api: Arc<dyn ChannelApi>, notifier: Arc<dyn Notifier>) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            api,
            notifier,
            state: Mutex::new(OrderState {
                confirmed: Vec::new(),
                confirmed_generation: 0,
                phase: ReorderPhase::Stable,
                generation: 0,
                pending: 0,
            }),
            items,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Channel>> {
        self.items.subscribe()
    }

    /// 現在の表示順
    pub fn items(&self) -> Vec<Channel> {
        self.items.borrow().clone()
    }

    pub async fn phase(&self) -> ReorderPhase {
        self.state.lock().await.phase
    }

    /// サーバーから取得した一覧を確定済みの並びとして保持する。
    /// これより前に送った保存の応答は確定順に使わない。
    pub async fn load(&self, channels: Vec<Channel>) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.confirmed = channels.clone();
        state.confirmed_generation = state.generation;
        state.settle_phase();
        self.items.send_replace(channels);
    }

    pub async fn refresh(&self) -> Result<(), AppError> {
        let channels = self.api.fetch_channels().await?;
        debug!(count = channels.len(), "Fetched channels");
        self.load(channels).await;
        Ok(())
    }

    pub async fn handle_drop(&self, event: DropEvent, actor: Option<&AuthUser>) -> ReorderOutcome {
        let Some(target_id) = event.target_id else {
            return ReorderOutcome::Unchanged;
        };
        if event.moved_id == target_id {
            return ReorderOutcome::Unchanged;
        }
        let persist = actor.is_some_and(AuthUser::is_admin);

        let (reordered, generation) = {
            let mut state = self.state.lock().await;
            let current = self.items.borrow().clone();
            let reordered = reconcile_order(&current, &event.moved_id, &target_id);
            if reordered == current {
                return ReorderOutcome::Unchanged;
            }

            state.generation += 1;
            if persist {
                state.pending += 1;
            }
            state.settle_phase();
            self.items.send_replace(reordered.clone());
            (reordered, state.generation)
        };

        if !persist {
            debug!(moved = %event.moved_id, "Reordered channels locally");
            return ReorderOutcome::LocalOnly;
        }

        let ordered_ids: Vec<ChannelId> = reordered.iter().map(|c| c.id.clone()).collect();
        let result = self.api.reorder_channels(&ordered_ids).await;

        let mut state = self.state.lock().await;
        state.pending = state.pending.saturating_sub(1);
        match result {
            Ok(()) => {
                info!(count = ordered_ids.len(), "Channel order saved");
                // 後から確定した並びや取得し直した一覧は上書きしない
                if generation > state.confirmed_generation {
                    state.confirmed = rebase_order(&reordered, &state.confirmed);
                    state.confirmed_generation = generation;
                }
                state.settle_phase();
                ReorderOutcome::Confirmed
            }
            Err(e) => {
                warn!(transient = e.is_transient(), "Failed to save channel order: {}", e);
                let outcome = if state.generation == generation {
                    state.phase = ReorderPhase::Reverting;
                    self.items.send_replace(state.confirmed.clone());
                    ReorderOutcome::Reverted
                } else {
                    ReorderOutcome::Superseded
                };
                state.settle_phase();
                drop(state);

                let message = if e.is_transient() {
                    REORDER_RETRY_MESSAGE
                } else {
                    REORDER_FAILED_MESSAGE
                };
                self.notifier.notify(Alert::error(message)).await;
                outcome
            }
        }
    }

    /// チャンネルを削除し、返ってきたエンティティの ID で一覧から外す
    pub async fn delete_channel(&self, id: &ChannelId) -> Result<Channel, AppError> {
        match self.api.delete_channel(id).await {
            Ok(deleted) => {
                {
                    let mut state = self.state.lock().await;
                    state.confirmed.retain(|channel| channel.id != deleted.id);
                    self.items
                        .send_modify(|items| items.retain(|channel| channel.id != deleted.id));
                }
                self.notifier.notify(Alert::success(DELETE_SUCCEEDED_MESSAGE)).await;
                Ok(deleted)
            }
            Err(e) => {
                warn!(channel_id = %id, "Failed to delete channel: {}", e);
                self.notifier.notify(Alert::error(DELETE_FAILED_MESSAGE)).await;
                Err(e)
            }
        }
    }
}

/// `order` の並びを保ったまま、`confirmed` に無くなった要素を落とし、
/// `order` に無い要素は末尾に足す
fn rebase_order(order: &[Channel], confirmed: &[Channel]) -> Vec<Channel> {
    let mut rebased: Vec<Channel> = order
        .iter()
        .filter_map(|item| confirmed.iter().find(|known| known.id == item.id).cloned())
        .collect();
    rebased.extend(
        confirmed
            .iter()
            .filter(|known| !order.iter().any(|item| item.id == known.id))
            .cloned(),
    );
    rebased
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::notifier::AlertKind;
    use crate::domain::entities::UserRole;
    use async_trait::async_trait;
    use mockall::mock;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;

    mock! {
        pub AlertSink {}

        #[async_trait]
        impl Notifier for AlertSink {
            async fn notify(&self, alert: Alert);
        }
    }

    /// 呼び出しを記録し、用意された結果を順に返す ChannelApi
    #[derive(Default)]
    struct FakeChannelApi {
        reorder_calls: StdMutex<Vec<Vec<ChannelId>>>,
        /// 保存呼び出しごとの結果。尽きたら成功
        results: StdMutex<VecDeque<Result<(), AppError>>>,
        /// 保存呼び出しごとの待ち合わせ。`None` ならすぐ返る
        gates: StdMutex<VecDeque<Option<oneshot::Receiver<()>>>>,
    }

    impl FakeChannelApi {
        fn with_results(results: Vec<Result<(), AppError>>) -> Self {
            Self {
                results: StdMutex::new(results.into()),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self::with_results(vec![Err(network_error())])
        }

        fn gated(self, gate: Option<oneshot::Receiver<()>>) -> Self {
            self.gates.lock().unwrap().push_back(gate);
            self
        }

        fn call_count(&self) -> usize {
            self.reorder_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChannelApi for FakeChannelApi {
        async fn fetch_channels(&self) -> Result<Vec<Channel>, AppError> {
            Ok(channels())
        }

        async fn reorder_channels(&self, ordered_ids: &[ChannelId]) -> Result<(), AppError> {
            self.reorder_calls.lock().unwrap().push(ordered_ids.to_vec());
            let result = self.results.lock().unwrap().pop_front().unwrap_or(Ok(()));
            let gate = self.gates.lock().unwrap().pop_front().flatten();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            result
        }

        async fn delete_channel(&self, id: &ChannelId) -> Result<Channel, AppError> {
            channels()
                .into_iter()
                .find(|channel| &channel.id == id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))
        }
    }

    fn network_error() -> AppError {
        AppError::Network("connection reset".into())
    }

    fn channels() -> Vec<Channel> {
        ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| Channel::new(name, name))
            .collect()
    }

    fn names(items: &[Channel]) -> Vec<String> {
        items.iter().map(|c| c.name.clone()).collect()
    }

    fn admin() -> AuthUser {
        AuthUser::new("admin", UserRole::Admin)
    }

    fn quiet_notifier() -> Arc<dyn Notifier> {
        let mut notifier = MockAlertSink::new();
        notifier.expect_notify().times(0);
        Arc::new(notifier)
    }

    async fn service_with(
        api: FakeChannelApi,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<FakeChannelApi>, ChannelOrderService) {
        let api = Arc::new(api);
        let service = ChannelOrderService::new(api.clone(), notifier);
        service.refresh().await.unwrap();
        (api, service)
    }

    /// 保存リクエストが `count` 件届くまで待つ
    async fn wait_for_calls(api: &FakeChannelApi, count: usize) {
        while api.call_count() < count {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_rebase_order_follows_confirmed_membership() {
        let order = channels();
        let confirmed: Vec<Channel> = ["c", "a", "d", "e"]
            .into_iter()
            .map(|name| Channel::new(name, name))
            .collect();

        assert_eq!(names(&rebase_order(&order, &confirmed)), vec!["a", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_admin_reorder_is_confirmed() {
        let (api, service) = service_with(FakeChannelApi::default(), quiet_notifier()).await;

        let outcome = service.handle_drop(DropEvent::new("a", "c"), Some(&admin())).await;

        assert_eq!(outcome, ReorderOutcome::Confirmed);
        assert_eq!(names(&service.items()), vec!["b", "c", "a", "d"]);
        assert_eq!(service.phase().await, ReorderPhase::Stable);
        let calls = api.reorder_calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[vec![
                ChannelId::from("b"),
                ChannelId::from("c"),
                ChannelId::from("a"),
                ChannelId::from("d")
            ]]
        );
    }

    #[tokio::test]
    async fn test_non_admin_reorder_stays_local() {
        let (api, service) = service_with(FakeChannelApi::default(), quiet_notifier()).await;
        let member = AuthUser::new("u1", UserRole::Regular);

        let outcome = service.handle_drop(DropEvent::new("d", "a"), Some(&member)).await;

        assert_eq!(outcome, ReorderOutcome::LocalOnly);
        assert_eq!(names(&service.items()), vec!["d", "a", "b", "c"]);
        assert_eq!(service.phase().await, ReorderPhase::Stable);
        assert_eq!(api.call_count(), 0);

        let anonymous = service.handle_drop(DropEvent::new("a", "b"), None).await;
        assert_eq!(anonymous, ReorderOutcome::LocalOnly);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_self_drop_and_missing_target_are_noops() {
        let (api, service) = service_with(FakeChannelApi::default(), quiet_notifier()).await;
        let mut rx = service.subscribe();
        rx.borrow_and_update();

        let self_drop = service.handle_drop(DropEvent::new("b", "b"), Some(&admin())).await;
        let outside = service
            .handle_drop(
                DropEvent {
                    moved_id: ChannelId::from("b"),
                    target_id: None,
                },
                Some(&admin()),
            )
            .await;

        assert_eq!(self_drop, ReorderOutcome::Unchanged);
        assert_eq!(outside, ReorderOutcome::Unchanged);
        assert_eq!(service.items(), channels());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_reverts_and_alerts() {
        let mut notifier = MockAlertSink::new();
        notifier
            .expect_notify()
            .withf(|alert| alert.kind == AlertKind::Error && alert.message == REORDER_RETRY_MESSAGE)
            .times(1)
            .returning(|_| ());
        let (_, service) = service_with(FakeChannelApi::failing(), Arc::new(notifier)).await;

        let outcome = service.handle_drop(DropEvent::new("a", "c"), Some(&admin())).await;

        assert_eq!(outcome, ReorderOutcome::Reverted);
        assert_eq!(service.items(), channels());
        assert_eq!(service.phase().await, ReorderPhase::Stable);
    }

    #[tokio::test]
    async fn test_permanent_failure_uses_generic_alert() {
        let mut notifier = MockAlertSink::new();
        notifier
            .expect_notify()
            .withf(|alert| alert.message == REORDER_FAILED_MESSAGE)
            .times(1)
            .returning(|_| ());
        let api = FakeChannelApi::with_results(vec![Err(AppError::NotFound("channel".into()))]);
        let (_, service) = service_with(api, Arc::new(notifier)).await;

        let outcome = service.handle_drop(DropEvent::new("b", "a"), Some(&admin())).await;

        assert_eq!(outcome, ReorderOutcome::Reverted);
        assert_eq!(service.items(), channels());
    }

    #[tokio::test]
    async fn test_new_order_is_visible_before_server_confirms() {
        let (release, gate) = oneshot::channel();
        let api = FakeChannelApi::default().gated(Some(gate));
        let (_, service) = service_with(api, quiet_notifier()).await;
        let service = Arc::new(service);
        let mut rx = service.subscribe();

        let task = {
            let service = service.clone();
            tokio::spawn(async move {
                service.handle_drop(DropEvent::new("a", "c"), Some(&admin())).await
            })
        };

        rx.changed().await.unwrap();
        assert_eq!(names(&rx.borrow()), vec!["b", "c", "a", "d"]);
        assert_eq!(service.phase().await, ReorderPhase::Reordering);

        release.send(()).unwrap();
        assert_eq!(task.await.unwrap(), ReorderOutcome::Confirmed);
        assert_eq!(service.phase().await, ReorderPhase::Stable);
    }

    #[tokio::test]
    async fn test_older_failure_after_newer_drop_is_superseded() {
        let mut notifier = MockAlertSink::new();
        notifier.expect_notify().times(1).returning(|_| ());
        let (release, gate) = oneshot::channel();
        let api = FakeChannelApi::with_results(vec![Err(network_error()), Ok(())]).gated(Some(gate));
        let (api, service) = service_with(api, Arc::new(notifier)).await;
        let service = Arc::new(service);

        let first = {
            let service = service.clone();
            tokio::spawn(async move {
                service.handle_drop(DropEvent::new("a", "c"), Some(&admin())).await
            })
        };
        wait_for_calls(&api, 1).await;

        // b c a d → d b c a
        let second = service.handle_drop(DropEvent::new("d", "b"), Some(&admin())).await;
        assert_eq!(second, ReorderOutcome::Confirmed);
        assert_eq!(service.phase().await, ReorderPhase::Reordering);

        release.send(()).unwrap();
        assert_eq!(first.await.unwrap(), ReorderOutcome::Superseded);
        assert_eq!(names(&service.items()), vec!["d", "b", "c", "a"]);
        assert_eq!(service.phase().await, ReorderPhase::Stable);
    }

    #[tokio::test]
    async fn test_late_confirmation_keeps_deleted_channel_out() {
        let mut notifier = MockAlertSink::new();
        notifier
            .expect_notify()
            .withf(|alert| alert.kind == AlertKind::Success)
            .times(1)
            .returning(|_| ());
        notifier
            .expect_notify()
            .withf(|alert| alert.kind == AlertKind::Error)
            .times(1)
            .returning(|_| ());
        let (release, gate) = oneshot::channel();
        let api = FakeChannelApi::with_results(vec![Ok(()), Err(network_error())]).gated(Some(gate));
        let (api, service) = service_with(api, Arc::new(notifier)).await;
        let service = Arc::new(service);

        let pending = {
            let service = service.clone();
            tokio::spawn(async move {
                service.handle_drop(DropEvent::new("a", "c"), Some(&admin())).await
            })
        };
        wait_for_calls(&api, 1).await;

        service.delete_channel(&ChannelId::from("b")).await.unwrap();
        assert_eq!(names(&service.items()), vec!["c", "a", "d"]);

        release.send(()).unwrap();
        assert_eq!(pending.await.unwrap(), ReorderOutcome::Confirmed);
        assert_eq!(names(&service.items()), vec!["c", "a", "d"]);

        // c a d → d c a が失敗したら、削除後に確定した c a d へ戻る
        let outcome = service.handle_drop(DropEvent::new("d", "c"), Some(&admin())).await;
        assert_eq!(outcome, ReorderOutcome::Reverted);
        assert_eq!(names(&service.items()), vec!["c", "a", "d"]);
    }

    #[tokio::test]
    async fn test_failure_during_delete_reverts_without_deleted_channel() {
        let mut notifier = MockAlertSink::new();
        notifier.expect_notify().times(2).returning(|_| ());
        let (release, gate) = oneshot::channel();
        let api = FakeChannelApi::failing().gated(Some(gate));
        let (api, service) = service_with(api, Arc::new(notifier)).await;
        let service = Arc::new(service);

        let pending = {
            let service = service.clone();
            tokio::spawn(async move {
                service.handle_drop(DropEvent::new("a", "c"), Some(&admin())).await
            })
        };
        wait_for_calls(&api, 1).await;
        service.delete_channel(&ChannelId::from("b")).await.unwrap();

        release.send(()).unwrap();
        assert_eq!(pending.await.unwrap(), ReorderOutcome::Reverted);
        assert_eq!(names(&service.items()), vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_late_confirmation_does_not_override_reload() {
        let (release, gate) = oneshot::channel();
        let api = FakeChannelApi::default().gated(Some(gate));
        let (api, service) = service_with(api, quiet_notifier()).await;
        let service = Arc::new(service);

        let pending = {
            let service = service.clone();
            tokio::spawn(async move {
                service.handle_drop(DropEvent::new("a", "c"), Some(&admin())).await
            })
        };
        wait_for_calls(&api, 1).await;
        service.load(channels().into_iter().rev().collect()).await;

        release.send(()).unwrap();
        assert_eq!(pending.await.unwrap(), ReorderOutcome::Confirmed);
        assert_eq!(names(&service.items()), vec!["d", "c", "b", "a"]);
        assert_eq!(
            names(&service.state.lock().await.confirmed),
            vec!["d", "c", "b", "a"]
        );
    }

    #[tokio::test]
    async fn test_revert_restores_last_confirmed_order() {
        let mut notifier = MockAlertSink::new();
        notifier.expect_notify().times(1).returning(|_| ());
        let api = FakeChannelApi::with_results(vec![Ok(()), Err(network_error())]);
        let (_, service) = service_with(api, Arc::new(notifier)).await;

        assert_eq!(
            service.handle_drop(DropEvent::new("a", "b"), Some(&admin())).await,
            ReorderOutcome::Confirmed
        );
        assert_eq!(
            service.handle_drop(DropEvent::new("d", "b"), Some(&admin())).await,
            ReorderOutcome::Reverted
        );
        assert_eq!(names(&service.items()), vec!["b", "a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_delete_channel_removes_by_returned_id() {
        let mut notifier = MockAlertSink::new();
        notifier
            .expect_notify()
            .withf(|alert| alert.kind == AlertKind::Success)
            .times(1)
            .returning(|_| ());
        let (_, service) = service_with(FakeChannelApi::default(), Arc::new(notifier)).await;

        let deleted = service.delete_channel(&ChannelId::from("b")).await.unwrap();

        assert_eq!(deleted.name, "b");
        assert_eq!(names(&service.items()), vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_delete_channel_failure_alerts() {
        let mut notifier = MockAlertSink::new();
        notifier
            .expect_notify()
            .withf(|alert| alert.kind == AlertKind::Error)
            .times(1)
            .returning(|_| ());
        let (_, service) = service_with(FakeChannelApi::default(), Arc::new(notifier)).await;

        let result = service.delete_channel(&ChannelId::from("zzz")).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(service.items(), channels());
    }
}
