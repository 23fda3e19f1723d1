use checklist_core::TableName;

/// SQL queries for the PostgreSQL store
pub struct Queries;

impl Queries {
    // Schema probes
    pub const PROBE_TASK_SECTIONS: &'static str = "SELECT id FROM task_sections LIMIT 1";

    pub const PROBE_TASKS: &'static str = "SELECT id FROM tasks LIMIT 1";

    pub fn probe(table: TableName) -> &'static str {
        match table {
            TableName::TaskSections => Self::PROBE_TASK_SECTIONS,
            TableName::Tasks => Self::PROBE_TASKS,
        }
    }

    // Section queries
    pub const LIST_SECTIONS: &'static str = r#"
        SELECT id, title, order_index
        FROM task_sections
        ORDER BY order_index ASC
    "#;

    pub const UPSERT_SECTION: &'static str = r#"
        INSERT INTO task_sections (id, title, order_index)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            order_index = EXCLUDED.order_index,
            updated_at = NOW()
    "#;

    // Task queries
    pub const LIST_SHARED_TASKS: &'static str = r#"
        SELECT id, section_id, title, completed, order_index
        FROM tasks
        WHERE user_id IS NULL
        ORDER BY order_index ASC
    "#;

    pub const LIST_USER_TASKS: &'static str = r#"
        SELECT id, section_id, title, completed, order_index
        FROM tasks
        WHERE user_id = $1
        ORDER BY order_index ASC
    "#;

    pub const COUNT_SHARED_TASKS: &'static str =
        "SELECT COUNT(*) FROM tasks WHERE user_id IS NULL";

    pub const COUNT_USER_TASKS: &'static str = "SELECT COUNT(*) FROM tasks WHERE user_id = $1";

    pub const SET_COMPLETED: &'static str = r#"
        UPDATE tasks
        SET completed = $2, updated_at = NOW()
        WHERE id = $1
    "#;

    pub const UPSERT_TASK: &'static str = r#"
        INSERT INTO tasks (id, section_id, user_id, title, completed, order_index)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
            section_id = EXCLUDED.section_id,
            title = EXCLUDED.title,
            order_index = EXCLUDED.order_index,
            updated_at = NOW()
    "#;

    pub const INSERT_TASK: &'static str = r#"
        INSERT INTO tasks (id, section_id, user_id, title, completed, order_index)
        VALUES ($1, $2, $3, $4, $5, $6)
    "#;

    // User queries
    pub const FIND_USER_BY_USERNAME: &'static str = r#"
        SELECT id, username, password_hash, created_at, updated_at
        FROM users
        WHERE username = $1
    "#;

    pub const CREATE_USER: &'static str = r#"
        INSERT INTO users (username, password_hash)
        VALUES ($1, $2)
        RETURNING id, username, password_hash, created_at, updated_at
    "#;
}
