use crate::model::{CompletionLog, Schedule, TaskView};
use crate::timefmt::format_instant;

pub fn schedule_label(schedule: &Schedule) -> String {
    match schedule {
        Schedule::Recurring {
            interval_value,
            unit,
        } => format!("every {interval_value} {unit}"),
        Schedule::OneOff { .. } => "once".to_string(),
    }
}

pub fn format_task_detail(view: &TaskView) -> String {
    let task = &view.task;
    let mut out = String::new();
    out.push_str(&format!("Id:        {}\n", task.id));
    out.push_str(&format!("Title:     {}\n", task.title));
    out.push_str(&format!("State:     {}\n", view.state().as_str()));
    out.push_str(&format!("Schedule:  {}\n", schedule_label(&task.schedule)));
    out.push_str(&format!("Due:       {}\n", format_instant(view.due_at)));
    match view.last_done {
        Some(t) => out.push_str(&format!("Last done: {}\n", format_instant(t))),
        None => out.push_str("Last done: never\n"),
    }
    out.push_str(&format!("Created:   {}\n", format_instant(task.created_at)));
    out.push_str(&format!("Updated:   {}\n", format_instant(task.updated_at)));
    if let Some(ref notes) = task.notes {
        out.push('\n');
        out.push_str("Notes:\n");
        for line in notes.lines() {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out
}

pub fn format_task_list(views: &[TaskView]) -> String {
    let mut out = String::new();
    for view in views {
        let task = &view.task;
        out.push_str(&format!(
            "{} {:>4}  {}  due {}  ({})\n",
            view.state().icon(),
            task.id,
            task.title,
            format_instant(view.due_at),
            schedule_label(&task.schedule),
        ));
    }
    out
}

pub fn format_logs(logs: &[CompletionLog]) -> String {
    let mut out = String::new();
    for log in logs {
        out.push_str(&format!(
            "[{}] {:>4}  {}\n",
            format_instant(log.done_at),
            log.task_id,
            log.title
        ));
    }
    out
}
