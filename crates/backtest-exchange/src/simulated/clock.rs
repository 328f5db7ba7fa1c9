//! 일시정지 가능한 가상 시계.
//!
//! 시계는 `[from, to]` 구간을 시뮬레이션하며, 실제 시간으로
//! `tick_interval`마다 시뮬레이션 시간을 1분씩 진행합니다. 진행된
//! 시각은 용량 1의 틱 채널로 전달되고, 소비자가 따라오지 못하면
//! 틱은 유실됩니다 (손실 허용). 정확한 현재 시각이 필요한 쪽은
//! [`VirtualClock::time`]을 직접 읽습니다.
//!
//! 일시정지는 카운팅 게이트입니다. `pause`가 중첩 호출되면 같은
//! 횟수의 `resume`이 있어야 시간이 다시 흐릅니다. 잔고 평가처럼
//! 정지 상태에서 다시 시세를 읽는 중첩 경로가 교착 없이 동작합니다.

use crate::error::{ExchangeError, ExchangeResult};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, trace};

/// 카운팅 일시정지 게이트.
struct PauseGate {
    count: StdMutex<u32>,
    resumed: Notify,
}

impl PauseGate {
    fn new() -> Self {
        Self {
            count: StdMutex::new(0),
            resumed: Notify::new(),
        }
    }

    fn lock_count(&self) -> MutexGuard<'_, u32> {
        self.count.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pause(&self) {
        *self.lock_count() += 1;
    }

    fn resume(&self) {
        let mut count = self.lock_count();
        if *count > 0 {
            *count -= 1;
            if *count == 0 {
                self.resumed.notify_waiters();
            }
        }
    }

    fn is_paused(&self) -> bool {
        *self.lock_count() > 0
    }

    /// 게이트가 열릴 때까지 기다린 뒤, 카운트 락을 잡은 채로 `f`를
    /// 실행합니다. `f` 실행 중에는 새 `pause`가 끼어들 수 없습니다.
    async fn run_when_open<R>(&self, f: impl FnOnce() -> R) -> R {
        loop {
            let notified = self.resumed.notified();
            {
                let count = self.lock_count();
                if *count == 0 {
                    return f();
                }
            }
            notified.await;
        }
    }
}

struct ClockInner {
    from: DateTime<Utc>,
    max_minutes: i64,
    tick_interval: std::time::Duration,
    offset_minutes: AtomicI64,
    gate: PauseGate,
    started: AtomicBool,
    running: AtomicBool,
    finished: AtomicBool,
    done: Notify,
    tick_tx: mpsc::Sender<DateTime<Utc>>,
    dropped_ticks: AtomicU64,
}

/// 가상 시계.
pub struct VirtualClock {
    inner: Arc<ClockInner>,
    tick_rx: StdMutex<Option<mpsc::Receiver<DateTime<Utc>>>>,
}

impl VirtualClock {
    /// `[from, to]` 구간을 시뮬레이션하는 시계를 생성합니다.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>, tick_interval: std::time::Duration) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel(1);

        Self {
            inner: Arc::new(ClockInner {
                from,
                max_minutes: (to - from).num_minutes(),
                tick_interval,
                offset_minutes: AtomicI64::new(0),
                gate: PauseGate::new(),
                started: AtomicBool::new(false),
                running: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                done: Notify::new(),
                tick_tx,
                dropped_ticks: AtomicU64::new(0),
            }),
            tick_rx: StdMutex::new(Some(tick_rx)),
        }
    }

    /// 틱 수신기를 가져갑니다. 최초 한 번만 `Some`을 반환합니다.
    pub fn take_tick_receiver(&self) -> Option<mpsc::Receiver<DateTime<Utc>>> {
        self.tick_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// 시계를 시작합니다.
    ///
    /// 구간이 이미 소진된 시계는 [`ExchangeError::ClockFinished`]를
    /// 반환합니다. 이미 동작 중이면 아무 일도 하지 않습니다.
    pub fn run(&self) -> ExchangeResult<()> {
        if self.inner.finished.load(Ordering::SeqCst) {
            return Err(ExchangeError::ClockFinished);
        }
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.started.store(true, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        debug!(from = %inner.from, minutes = inner.max_minutes, "virtual clock started");

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(inner.tick_interval).await;

                let finished = inner
                    .gate
                    .run_when_open(|| {
                        let next = inner.offset_minutes.load(Ordering::SeqCst) + 1;
                        if next > inner.max_minutes {
                            return true;
                        }
                        inner.offset_minutes.store(next, Ordering::SeqCst);

                        let t = inner.from + Duration::minutes(next);
                        if inner.tick_tx.try_send(t).is_err() {
                            inner.dropped_ticks.fetch_add(1, Ordering::Relaxed);
                            trace!(time = %t, "tick dropped, consumer busy");
                        }
                        false
                    })
                    .await;

                if finished {
                    break;
                }
            }

            inner.running.store(false, Ordering::SeqCst);
            inner.finished.store(true, Ordering::SeqCst);
            inner.done.notify_waiters();
            debug!("virtual clock finished");
        });

        Ok(())
    }

    /// 현재 시뮬레이션 시각을 반환합니다.
    pub fn time(&self) -> DateTime<Utc> {
        self.inner.from + Duration::minutes(self.inner.offset_minutes.load(Ordering::SeqCst))
    }

    /// 시간을 정지합니다. `run` 전에는 아무 일도 하지 않습니다.
    pub fn pause(&self) {
        if self.inner.started.load(Ordering::SeqCst) {
            self.inner.gate.pause();
        }
    }

    /// 시간을 다시 흐르게 합니다. 중첩된 `pause`와 짝을 이룹니다.
    pub fn resume(&self) {
        if self.inner.started.load(Ordering::SeqCst) {
            self.inner.gate.resume();
        }
    }

    /// 스코프가 끝나면 자동으로 `resume`되는 일시정지 가드를 반환합니다.
    pub fn pause_guard(&self) -> ClockPauseGuard<'_> {
        self.pause();
        ClockPauseGuard { clock: self }
    }

    /// 일시정지 상태인지 확인합니다.
    pub fn is_paused(&self) -> bool {
        self.inner.gate.is_paused()
    }

    /// 구간이 모두 소진되었는지 확인합니다.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// 유실된 틱 수를 반환합니다.
    pub fn dropped_ticks(&self) -> u64 {
        self.inner.dropped_ticks.load(Ordering::Relaxed)
    }

    /// 구간이 소진될 때까지 기다립니다.
    pub async fn done(&self) {
        loop {
            let notified = self.inner.done.notified();
            if self.inner.finished.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

/// Drop 시 시계를 재개하는 가드.
pub struct ClockPauseGuard<'a> {
    clock: &'a VirtualClock,
}

impl Drop for ClockPauseGuard<'_> {
    fn drop(&mut self) {
        self.clock.resume();
    }
}
