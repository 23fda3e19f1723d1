//! Fixed checklist content: the three phases, their nine tasks, the setup
//! script that creates and fills the tables, and the onboarding guide.

use serde::Serialize;

use crate::models::{Task, TaskScope, TaskSection};

struct SeedSection {
    id: &'static str,
    title: &'static str,
    order_index: i32,
}

struct SeedTask {
    id: &'static str,
    section_id: &'static str,
    title: &'static str,
    order_index: i32,
}

const SECTIONS: [SeedSection; 3] = [
    SeedSection {
        id: "phase1",
        title: "Phase 1: Preparation and planning",
        order_index: 1,
    },
    SeedSection {
        id: "phase2",
        title: "Phase 2: Data collection",
        order_index: 2,
    },
    SeedSection {
        id: "phase3",
        title: "Phase 3: Analysis and writing",
        order_index: 3,
    },
];

// order_index is local to each section
const TASKS: [SeedTask; 9] = [
    SeedTask {
        id: "task1",
        section_id: "phase1",
        title: "Spend 10 minutes listing every question about the report (brainstorm, don't polish)",
        order_index: 1,
    },
    SeedTask {
        id: "task2",
        section_id: "phase1",
        title: "Draft a simple report outline and pick the key dimensions to analyze",
        order_index: 2,
    },
    SeedTask {
        id: "task3",
        section_id: "phase1",
        title: "Book 15 minutes with your manager to confirm scope and expectations (asking is professional)",
        order_index: 3,
    },
    SeedTask {
        id: "task4",
        section_id: "phase2",
        title: "Give each product 30 minutes of research (Pomodoro: 5-minute break every 30 minutes)",
        order_index: 1,
    },
    SeedTask {
        id: "task5",
        section_id: "phase2",
        title: "Ask the product team for data or test access (teamwork is part of the job)",
        order_index: 2,
    },
    SeedTask {
        id: "task6",
        section_id: "phase3",
        title: "Build a comparison table of each product's strengths and weaknesses",
        order_index: 1,
    },
    SeedTask {
        id: "task7",
        section_id: "phase3",
        title: "Write a first draft (aim for something you can iterate on)",
        order_index: 2,
    },
    SeedTask {
        id: "task8",
        section_id: "phase3",
        title: "Ask a trusted colleague to review it and suggest improvements",
        order_index: 3,
    },
    SeedTask {
        id: "task9",
        section_id: "phase3",
        title: "Revise and finish the report based on the feedback",
        order_index: 4,
    },
];

pub fn seed_sections() -> Vec<TaskSection> {
    SECTIONS
        .iter()
        .map(|section| TaskSection {
            id: section.id.to_string(),
            title: section.title.to_string(),
            order_index: section.order_index,
        })
        .collect()
}

/// The nine seed tasks, with ids namespaced for `scope`. All start incomplete.
pub fn seed_tasks(scope: TaskScope) -> Vec<Task> {
    TASKS
        .iter()
        .map(|task| Task {
            id: scope.task_id(task.id),
            section_id: task.section_id.to_string(),
            title: task.title.to_string(),
            completed: false,
            order_index: task.order_index,
        })
        .collect()
}

/// Schema and seed script for the store's SQL editor. The application can
/// write rows but never runs DDL, so tables only come from this script.
pub const SETUP_SCRIPT: &str = r#"-- Checklist database setup script
-- Run this once in your database's SQL editor.

CREATE TABLE IF NOT EXISTS users (
  id BIGSERIAL PRIMARY KEY,
  username TEXT NOT NULL UNIQUE,
  password_hash TEXT NOT NULL,
  created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
  updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS task_sections (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  order_index INTEGER NOT NULL,
  created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
  updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS tasks (
  id TEXT PRIMARY KEY,
  section_id TEXT NOT NULL REFERENCES task_sections(id) ON DELETE CASCADE,
  user_id BIGINT REFERENCES users(id) ON DELETE CASCADE,
  title TEXT NOT NULL,
  completed BOOLEAN DEFAULT FALSE,
  order_index INTEGER NOT NULL,
  created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
  updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_tasks_section_id ON tasks(section_id);
CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks(completed);
CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id);
CREATE INDEX IF NOT EXISTS idx_task_sections_order ON task_sections(order_index);
CREATE INDEX IF NOT EXISTS idx_tasks_order ON tasks(section_id, order_index);

INSERT INTO task_sections (id, title, order_index) VALUES
  ('phase1', 'Phase 1: Preparation and planning', 1),
  ('phase2', 'Phase 2: Data collection', 2),
  ('phase3', 'Phase 3: Analysis and writing', 3)
ON CONFLICT (id) DO UPDATE SET
  title = EXCLUDED.title,
  order_index = EXCLUDED.order_index,
  updated_at = NOW();

INSERT INTO tasks (id, section_id, title, completed, order_index) VALUES
  ('task1', 'phase1', 'Spend 10 minutes listing every question about the report (brainstorm, don''t polish)', false, 1),
  ('task2', 'phase1', 'Draft a simple report outline and pick the key dimensions to analyze', false, 2),
  ('task3', 'phase1', 'Book 15 minutes with your manager to confirm scope and expectations (asking is professional)', false, 3),
  ('task4', 'phase2', 'Give each product 30 minutes of research (Pomodoro: 5-minute break every 30 minutes)', false, 1),
  ('task5', 'phase2', 'Ask the product team for data or test access (teamwork is part of the job)', false, 2),
  ('task6', 'phase3', 'Build a comparison table of each product''s strengths and weaknesses', false, 1),
  ('task7', 'phase3', 'Write a first draft (aim for something you can iterate on)', false, 2),
  ('task8', 'phase3', 'Ask a trusted colleague to review it and suggest improvements', false, 3),
  ('task9', 'phase3', 'Revise and finish the report based on the feedback', false, 4)
ON CONFLICT (id) DO UPDATE SET
  section_id = EXCLUDED.section_id,
  title = EXCLUDED.title,
  order_index = EXCLUDED.order_index,
  updated_at = NOW();

SELECT 'task_sections' AS table_name, count(*) AS record_count FROM task_sections
UNION ALL
SELECT 'tasks' AS table_name, count(*) AS record_count FROM tasks;
"#;

#[derive(Debug, Clone, Serialize)]
pub struct GuideStep {
    pub number: u8,
    pub title: &'static str,
    pub instructions: &'static [&'static str],
    /// Text worth copying verbatim (variable names, the script).
    pub copyable: &'static [&'static str],
}

pub const SETUP_GUIDE: [GuideStep; 4] = [
    GuideStep {
        number: 1,
        title: "Create a database project",
        instructions: &[
            "Open your hosted database provider's dashboard and create a new project",
            "Pick an organization and a project name, e.g. \"checklist-demo\"",
            "Set a database password and keep it somewhere safe",
            "Choose the region closest to you and create the project",
        ],
        copyable: &[],
    },
    GuideStep {
        number: 2,
        title: "Find the connection settings",
        instructions: &[
            "Open the project's connection settings",
            "The connection URL becomes CHECKLIST_STORE_URL",
            "The key or password becomes CHECKLIST_STORE_KEY",
        ],
        copyable: &[],
    },
    GuideStep {
        number: 3,
        title: "Configure the environment",
        instructions: &["Export both variables before starting the server"],
        copyable: &["CHECKLIST_STORE_URL=", "CHECKLIST_STORE_KEY="],
    },
    GuideStep {
        number: 4,
        title: "Initialize the database",
        instructions: &[
            "Restart the server so it picks up the configuration",
            "Run the setup script (GET /api/setup/script) in the SQL editor",
            "Confirm with \"setup done\" so the checklist reloads from the database",
        ],
        copyable: &[],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_shape() {
        let sections = seed_sections();
        let tasks = seed_tasks(TaskScope::Shared);

        assert_eq!(sections.len(), 3);
        assert_eq!(tasks.len(), 9);

        let section_ids: HashSet<_> = sections.iter().map(|s| s.id.as_str()).collect();
        assert!(tasks.iter().all(|t| section_ids.contains(t.section_id.as_str())));
        assert!(tasks.iter().all(|t| !t.completed));

        let per_section: Vec<usize> = sections
            .iter()
            .map(|s| tasks.iter().filter(|t| t.section_id == s.id).count())
            .collect();
        assert_eq!(per_section, vec![3, 2, 4]);
    }

    #[test]
    fn test_order_index_is_one_based_per_section() {
        let tasks = seed_tasks(TaskScope::Shared);
        for section in seed_sections() {
            let order: Vec<i32> = tasks
                .iter()
                .filter(|t| t.section_id == section.id)
                .map(|t| t.order_index)
                .collect();
            let expected: Vec<i32> = (1..=order.len() as i32).collect();
            assert_eq!(order, expected, "section {}", section.id);
        }
    }

    #[test]
    fn test_owner_scoped_ids() {
        let tasks = seed_tasks(TaskScope::Owner(42));
        assert_eq!(tasks[0].id, "task1_user42");
        assert_eq!(tasks[8].id, "task9_user42");
    }

    #[test]
    fn test_script_seeds_every_row() {
        for section in seed_sections() {
            assert!(SETUP_SCRIPT.contains(&format!("('{}',", section.id)));
        }
        for task in seed_tasks(TaskScope::Shared) {
            assert!(SETUP_SCRIPT.contains(&format!("('{}', '{}'", task.id, task.section_id)));
        }
        assert!(SETUP_SCRIPT.contains("ON CONFLICT (id) DO UPDATE"));
    }
}
