use serde::{Deserialize, Serialize};

use crate::errors::ChecklistError;
use crate::models::{Task, TaskScope, TaskSection, TaskSectionWithTasks};
use crate::seed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl Progress {
    /// `percent` is `100 * completed / total` rounded half up, or 0 for an
    /// empty scope.
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((200 * completed + total) / (2 * total)).min(100) as u8
        };
        Self {
            completed,
            total,
            percent,
        }
    }

    pub fn is_all_completed(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// The local checklist model that the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBoard {
    pub sections: Vec<TaskSectionWithTasks>,
}

impl TaskBoard {
    /// Group `tasks` under `sections`, keeping `order_index` order at both
    /// levels. Tasks whose section is not listed are dropped.
    pub fn from_rows(mut sections: Vec<TaskSection>, mut tasks: Vec<Task>) -> Self {
        sections.sort_by_key(|section| section.order_index);
        tasks.sort_by_key(|task| task.order_index);

        let sections = sections
            .into_iter()
            .map(|section| {
                let tasks = tasks
                    .iter()
                    .filter(|task| task.section_id == section.id)
                    .cloned()
                    .collect();
                TaskSectionWithTasks { section, tasks }
            })
            .collect();

        Self { sections }
    }

    /// The built-in dataset shown whenever the store can't be used.
    pub fn default_dataset() -> Self {
        Self::from_rows(seed::seed_sections(), seed::seed_tasks(TaskScope::Shared))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.sections.iter().map(|section| section.tasks.len()).sum()
    }

    pub fn section(&self, section_id: &str) -> Option<&TaskSectionWithTasks> {
        self.sections.iter().find(|section| section.id() == section_id)
    }

    pub fn task(&self, section_id: &str, task_id: &str) -> Option<&Task> {
        self.section(section_id)?
            .tasks
            .iter()
            .find(|task| task.id == task_id)
    }

    pub fn progress(&self) -> Progress {
        let completed = self
            .sections
            .iter()
            .map(TaskSectionWithTasks::completed_count)
            .sum();
        Progress::new(completed, self.task_count())
    }

    pub fn section_progress(&self, section_id: &str) -> Option<Progress> {
        self.section(section_id)
            .map(|section| Progress::new(section.completed_count(), section.tasks.len()))
    }

    pub fn is_all_completed(&self) -> bool {
        self.progress().is_all_completed()
    }

    /// Flip one task's `completed` flag and return the new value.
    pub fn toggle(&mut self, section_id: &str, task_id: &str) -> Result<bool, ChecklistError> {
        let task = self
            .sections
            .iter_mut()
            .find(|section| section.id() == section_id)
            .and_then(|section| section.tasks.iter_mut().find(|task| task.id == task_id))
            .ok_or_else(|| ChecklistError::TaskNotFound {
                section_id: section_id.to_string(),
                task_id: task_id.to_string(),
            })?;

        task.completed = !task.completed;
        Ok(task.completed)
    }

    /// Set a task's flag by id alone. Returns false if no task has that id.
    pub fn set_completed(&mut self, task_id: &str, completed: bool) -> bool {
        match self
            .sections
            .iter_mut()
            .flat_map(|section| section.tasks.iter_mut())
            .find(|task| task.id == task_id)
        {
            Some(task) => {
                task.completed = completed;
                true
            }
            None => false,
        }
    }
}
