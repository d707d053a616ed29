// scheduler.rs — 虚拟时钟上的定时器 (setTimeout / setInterval)
//
// Time only moves when the host says so. The desktop loop feeds it real frame
// deltas; tests feed it whatever they like.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

#[derive(Debug, Clone)]
struct Timer<T> {
    id: TimerId,
    due: Duration,
    period: Option<Duration>,
    task: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    timers: Vec<Timer<T>>,
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            timers: Vec::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    fn push(&mut self, delay: Duration, period: Option<Duration>, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            period,
            task,
        });
        id
    }

    /// Run `task` once, `delay` from now.
    pub fn set_timeout(&mut self, delay: Duration, task: T) -> TimerId {
        self.push(delay, None, task)
    }

    /// Run `task` every `period` until cleared.
    pub fn set_interval(&mut self, period: Duration, task: T) -> TimerId {
        // 零周期会让 pop_due 死循环
        let period = period.max(Duration::from_millis(1));
        self.push(period, Some(period), task)
    }

    /// Drop a timer. Returns whether it was still pending.
    pub fn clear(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Take the earliest task due at or before `until`, moving the clock to
    /// its due time. Ties go to the older timer. Intervals re-arm.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let (pos, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id))?;

        let timer = &mut self.timers[pos];
        self.now = self.now.max(timer.due);
        let id = timer.id;

        match timer.period {
            Some(period) => {
                timer.due += period;
                Some((id, timer.task.clone()))
            }
            None => {
                let timer = self.timers.swap_remove(pos);
                Some((id, timer.task))
            }
        }
    }

    /// Move the clock forward once every due task has been taken.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn drain(s: &mut Scheduler<&'static str>, until: Duration) -> Vec<(u64, &'static str)> {
        let mut fired = Vec::new();
        while let Some((_, task)) = s.pop_due(until) {
            fired.push((s.now().as_millis() as u64, task));
        }
        s.settle(until);
        fired
    }

    #[test]
    fn timeouts_fire_in_due_order() {
        let mut s = Scheduler::new();
        s.set_timeout(ms(300), "late");
        s.set_timeout(ms(100), "early");
        s.set_timeout(ms(100), "early-second");

        assert_eq!(
            drain(&mut s, ms(500)),
            vec![(100, "early"), (100, "early-second"), (300, "late")]
        );
        assert_eq!(s.pending(), 0);
        assert_eq!(s.now(), ms(500));
    }

    #[test]
    fn intervals_rearm_until_cleared() {
        let mut s = Scheduler::new();
        let id = s.set_interval(ms(17), "tick");
        assert_eq!(drain(&mut s, ms(50)).len(), 2);
        assert!(s.is_pending(id));

        assert!(s.clear(id));
        assert!(!s.clear(id));
        assert!(drain(&mut s, ms(500)).is_empty());
    }

    #[test]
    fn nothing_fires_early() {
        let mut s = Scheduler::new();
        s.set_timeout(ms(1100), "open");
        assert!(drain(&mut s, ms(1099)).is_empty());
        assert_eq!(drain(&mut s, ms(1100)), vec![(1100, "open")]);
    }

    #[test]
    fn delays_are_relative_to_the_current_time() {
        let mut s = Scheduler::new();
        s.settle(ms(1000));
        s.set_timeout(ms(800), "spread");
        assert_eq!(drain(&mut s, ms(2000)), vec![(1800, "spread")]);
    }
}
