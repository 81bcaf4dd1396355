//! Statistics aggregator.
//!
//! Pure arithmetic over durations that the caller has already projected
//! (live values for whatever is running, resting values for the rest).
//! Percentages are `f64`; divisions by a non-positive base yield 0.

use serde::{Deserialize, Serialize};

use super::ids::TaskId;

/// Durations of one task as seen at the instant of computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTime {
    pub task_id: TaskId,
    /// Persisted resting duration; drives the per-task share.
    pub resting_seconds: i64,
    /// Live projection if the task is active, resting duration otherwise.
    pub counted_seconds: i64,
    pub pause_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsInput {
    pub routine_seconds: i64,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub tasks: Vec<TaskTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskShare {
    pub task_id: TaskId,
    /// Clamped to [0, 100].
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineStats {
    pub routine_seconds: i64,
    pub total_task_seconds: i64,
    pub total_pause_seconds: i64,
    pub utilization_percent: f64,
    pub completion_percent: f64,
    /// Routine time not attributable to any task being worked.
    pub time_lost_seconds: i64,
    /// Time lost minus pauses: the routine ran with no task started at all.
    pub time_lost_without_tasks_seconds: i64,
    /// Time lost over routine duration.
    pub lost_percent: f64,
    /// Breakdown of time lost; both divide by time lost.
    pub lost_without_tasks_percent: f64,
    pub lost_in_pauses_percent: f64,
    pub task_shares: Vec<TaskShare>,
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 { 0.0 } else { 100.0 * part / whole }
}

impl RoutineStats {
    pub fn compute(input: &StatsInput) -> Self {
        let routine = input.routine_seconds;
        let total_task: i64 = input.tasks.iter().map(|t| t.counted_seconds).sum();
        let total_pause: i64 = input.tasks.iter().map(|t| t.pause_seconds).sum();

        let time_lost = routine - total_task;
        let time_lost_without_tasks = time_lost - total_pause;

        let task_shares = input
            .tasks
            .iter()
            .map(|t| TaskShare {
                task_id: t.task_id,
                percent: percent(t.resting_seconds as f64, routine as f64).clamp(0.0, 100.0),
            })
            .collect();

        Self {
            routine_seconds: routine,
            total_task_seconds: total_task,
            total_pause_seconds: total_pause,
            utilization_percent: percent(total_task as f64, routine as f64),
            completion_percent: percent(
                f64::from(input.completed_tasks),
                f64::from(input.total_tasks),
            ),
            time_lost_seconds: time_lost,
            time_lost_without_tasks_seconds: time_lost_without_tasks,
            lost_percent: percent(time_lost as f64, routine as f64),
            lost_without_tasks_percent: percent(time_lost_without_tasks as f64, time_lost as f64),
            lost_in_pauses_percent: percent(total_pause as f64, time_lost as f64),
            task_shares,
        }
    }
}

/// Remembers the last computation so repeated ticks with identical inputs
/// do not recompute.
#[derive(Debug, Default)]
pub struct StatsMemo {
    last: Option<(StatsInput, RoutineStats)>,
}

impl StatsMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, input: StatsInput) -> &RoutineStats {
        if !self.is_cached(&input) {
            self.last = None;
        }
        let (_, stats) = self.last.get_or_insert_with(|| {
            let stats = RoutineStats::compute(&input);
            (input, stats)
        });
        stats
    }

    pub fn is_cached(&self, input: &StatsInput) -> bool {
        matches!(&self.last, Some((cached, _)) if cached == input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn task(resting: i64, counted: i64, pause: i64) -> TaskTime {
        TaskTime {
            task_id: TaskId::from_ulid(Ulid::new()),
            resting_seconds: resting,
            counted_seconds: counted,
            pause_seconds: pause,
        }
    }

    fn input(routine: i64, tasks: Vec<TaskTime>) -> StatsInput {
        StatsInput {
            routine_seconds: routine,
            total_tasks: tasks.len() as u32,
            completed_tasks: 0,
            tasks,
        }
    }

    #[test]
    fn time_lost_and_breakdown() {
        let stats = RoutineStats::compute(&input(
            500,
            vec![task(200, 200, 30), task(100, 100, 20)],
        ));

        assert_eq!(stats.total_task_seconds, 300);
        assert_eq!(stats.time_lost_seconds, 200);
        assert_eq!(stats.total_pause_seconds, 50);
        assert_eq!(stats.time_lost_without_tasks_seconds, 150);
        assert_eq!(stats.utilization_percent, 60.0);
        assert_eq!(stats.lost_percent, 40.0);
        assert_eq!(stats.lost_without_tasks_percent, 75.0);
        assert_eq!(stats.lost_in_pauses_percent, 25.0);
    }

    #[test]
    fn live_task_counts_towards_total_but_not_share() {
        let stats = RoutineStats::compute(&input(100, vec![task(20, 50, 0)]));
        assert_eq!(stats.total_task_seconds, 50);
        assert_eq!(stats.task_shares[0].percent, 20.0);
    }

    #[rstest]
    #[case::zero_routine(0)]
    #[case::negative_routine(-5)]
    fn zero_routine_yields_zero_percentages(#[case] routine: i64) {
        let stats = RoutineStats::compute(&input(routine, vec![task(10, 10, 0)]));
        assert_eq!(stats.utilization_percent, 0.0);
        assert_eq!(stats.lost_percent, 0.0);
        assert_eq!(stats.task_shares[0].percent, 0.0);
    }

    #[test]
    fn no_time_lost_guards_breakdown() {
        let stats = RoutineStats::compute(&input(100, vec![task(120, 120, 10)]));
        assert_eq!(stats.time_lost_seconds, -20);
        assert_eq!(stats.lost_without_tasks_percent, 0.0);
        assert_eq!(stats.lost_in_pauses_percent, 0.0);
        // Share is clamped for display.
        assert_eq!(stats.task_shares[0].percent, 100.0);
    }

    #[rstest]
    #[case::none(0, 0, 0.0)]
    #[case::half(4, 2, 50.0)]
    #[case::all(3, 3, 100.0)]
    fn completion_percent(#[case] total: u32, #[case] completed: u32, #[case] expected: f64) {
        let stats = RoutineStats::compute(&StatsInput {
            routine_seconds: 10,
            total_tasks: total,
            completed_tasks: completed,
            tasks: vec![],
        });
        assert_eq!(stats.completion_percent, expected);
    }

    #[test]
    fn memo_reuses_last_result() {
        let mut memo = StatsMemo::new();
        let i = input(500, vec![task(300, 300, 0)]);
        assert!(!memo.is_cached(&i));

        let first = memo.get(i.clone()).clone();
        assert!(memo.is_cached(&i));
        assert_eq!(*memo.get(i.clone()), first);

        let other = input(600, vec![task(300, 300, 0)]);
        assert_eq!(memo.get(other.clone()).routine_seconds, 600);
        assert!(!memo.is_cached(&i));
    }
}
