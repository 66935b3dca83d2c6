use serde::{Deserialize, Serialize};

use crate::tasks::{Task, TaskContext, TaskResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskProgress {
    pub task_name: String,
    /// Position of the task in the batch, 1-based.
    pub position: usize,
    pub total: usize,
    pub status: String,
    pub message: Option<String>,
}

type ProgressCallback = Box<dyn Fn(&TaskProgress)>;

/// Runs output tasks one after another. A failing task is recorded and the rest still run.
#[derive(Default)]
pub struct TaskExecutor {
    on_progress: Option<ProgressCallback>,
}

impl TaskExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable progress tracking
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TaskProgress) + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    fn report_progress(&self, progress: TaskProgress) {
        if let Some(callback) = &self.on_progress {
            callback(&progress);
        }
    }

    pub fn execute_one(&self, task: &dyn Task, context: &TaskContext<'_>, position: usize, total: usize) -> TaskResult {
        let task_name = task.name().to_string();

        self.report_progress(TaskProgress {
            task_name: task_name.clone(),
            position,
            total,
            status: "starting".to_string(),
            message: None,
        });

        let result = match task.execute(context) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(task = %task_name, error = %e, "task failed");
                TaskResult::failure(e.to_string())
            }
        };

        if let Some(error) = &result.error {
            tracing::warn!(task = %task_name, error = %error, "task did not complete");
        }

        self.report_progress(TaskProgress {
            task_name,
            position,
            total,
            status: if result.success { "completed" } else { "failed" }.to_string(),
            message: result.error.clone(),
        });

        result
    }

    /// Execute tasks in order; the result list is parallel to `tasks`.
    pub fn execute_batch(&self, tasks: &[Box<dyn Task>], context: &TaskContext<'_>) -> Vec<TaskResult> {
        let total = tasks.len();
        tasks
            .iter()
            .enumerate()
            .map(|(i, task)| self.execute_one(task.as_ref(), context, i + 1, total))
            .collect()
    }
}
