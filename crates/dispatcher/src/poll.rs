use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// 周期执行原语：按固定间隔调用回调，直到收到关闭信号
///
/// 回调总是被等待到完成后才处理下一个tick，同一实例内周期不会重叠；
/// 错过的tick延后执行而不是补发。回调自行处理业务错误，不应panic。
pub async fn run_every<F, Fut>(
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => tick().await,
            _ = shutdown_rx.recv() => {
                info!("轮询循环收到关闭信号");
                break;
            }
        }
    }
}
