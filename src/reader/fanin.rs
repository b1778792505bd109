//! Async fan-in for component renderers that call out to external
//! preprocessors (image/audio decoding), per `spec.md` §5 and the
//! `SPEC_FULL.md` §9.5 resolution: no async runtime is pulled in; instead
//! each child task is run to completion before the next starts, preserving
//! document order, with first-error-wins semantics.

use crate::error::CompileError;

/// An external collaborator that may need to do blocking/async work to
/// resolve a component's content (the image/audio preprocessors named as
/// out-of-scope collaborators in `spec.md` §1).
pub trait PreprocessorTask<T> {
    fn run(self: Box<Self>) -> Result<T, CompileError>;
}

impl<T, F> PreprocessorTask<T> for F
where
    F: FnOnce() -> Result<T, CompileError>,
{
    fn run(self: Box<Self>) -> Result<T, CompileError> {
        (*self)()
    }
}

/// Join a sequence of tasks in document order. The first error encountered
/// is recorded into `errors` and that task's slot is dropped from the
/// result (the reader substitutes an empty fragment for it); subsequent
/// tasks still run so later siblings are not starved by an earlier failure
/// (`spec.md` §5: "any rejection is recorded ... and the corresponding
/// subtree becomes an empty fragment").
pub fn join_in_order<T>(
    tasks: Vec<Box<dyn PreprocessorTask<T>>>,
    errors: &mut Vec<CompileError>,
) -> Vec<T> {
    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.run() {
            Ok(value) => results.push(value),
            Err(e) => errors.push(e),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_task(n: i32) -> Box<dyn PreprocessorTask<i32>> {
        Box::new(move || Ok(n))
    }

    fn err_task(msg: &'static str) -> Box<dyn PreprocessorTask<i32>> {
        Box::new(move || Err(CompileError::read(msg, None, None)))
    }

    #[test]
    fn all_ok_tasks_preserve_document_order() {
        let mut errors = Vec::new();
        let out = join_in_order(vec![ok_task(1), ok_task(2), ok_task(3)], &mut errors);
        assert_eq!(out, vec![1, 2, 3]);
        assert!(errors.is_empty());
    }

    #[test]
    fn a_failing_task_is_dropped_but_later_tasks_still_run() {
        let mut errors = Vec::new();
        let out = join_in_order(vec![ok_task(1), err_task("boom"), ok_task(3)], &mut errors);
        assert_eq!(out, vec![1, 3]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("boom"));
    }
}
