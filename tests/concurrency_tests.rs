use allure_lifecycle::model::{Label, Stage, Status, StepResult, TestResult, TestResultContainer};
use allure_lifecycle::report::InMemoryResultsWriter;
use allure_lifecycle::AllureLifecycle;
use std::sync::{Arc, Barrier};
use std::thread;

fn setup() -> (Arc<AllureLifecycle>, Arc<InMemoryResultsWriter>) {
    let writer = Arc::new(InMemoryResultsWriter::new());
    (Arc::new(AllureLifecycle::new(writer.clone())), writer)
}

#[test]
fn test_parallel_tests_keep_separate_contexts() {
    const THREADS: usize = 16;
    let (lc, writer) = setup();
    lc.start_test_container(TestResultContainer::new("suite"));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let lc = lc.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let uuid = format!("test-{}", i);
                lc.schedule_test_case_in("suite", TestResult::new(&uuid));
                barrier.wait();

                lc.start_test_case(&uuid);
                for j in 0..3 {
                    let step = format!("{}-step-{}", uuid, j);
                    lc.start_step_in_current(&step, StepResult::new(&step));
                    assert_eq!(lc.current_step().as_deref(), Some(step.as_str()));
                    lc.stop_current_step();
                }
                assert_eq!(lc.current_test_case().as_deref(), Some(uuid.as_str()));
                lc.update_current_test_case(|r| r.status = Some(Status::Passed));
                lc.stop_test_case(&uuid);
                lc.write_test_case(&uuid);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    lc.stop_test_container("suite");
    lc.write_test_container("suite");

    let results = writer.test_results();
    assert_eq!(results.len(), THREADS);
    for result in &results {
        assert_eq!(result.status, Some(Status::Passed));
        assert_eq!(result.steps.len(), 3);
        for step in &result.steps {
            assert!(step.name.as_deref().unwrap().starts_with(&result.uuid));
        }
    }
    assert_eq!(writer.container("suite").unwrap().children.len(), THREADS);
    assert_eq!(lc.in_flight(), 0);
}

#[test]
fn test_spawned_thread_inherits_running_test() {
    let (lc, writer) = setup();
    lc.schedule_test_case(TestResult::new("x"));
    lc.start_test_case("x");

    let inner = lc.clone();
    let worker = lc.spawn(move || {
        assert_eq!(inner.current_test_case().as_deref(), Some("x"));
        inner.start_step_in_current("worker-step", StepResult::new("from worker"));
        inner.stop_step("worker-step");
    });
    worker.join().unwrap();

    assert!(lc.current_step().is_none());
    lc.stop_test_case("x");
    lc.write_test_case("x");

    let result = writer.test_result("x").unwrap();
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].name.as_deref(), Some("from worker"));
    assert_eq!(result.steps[0].stage, Stage::Finished);
}

#[test]
fn test_plain_thread_starts_with_empty_context() {
    let (lc, _writer) = setup();
    lc.schedule_test_case(TestResult::new("x"));
    lc.start_test_case("x");

    let other = lc.clone();
    let seen = thread::spawn(move || other.current_test_case()).join().unwrap();
    assert!(seen.is_none());
}

#[test]
fn test_child_context_changes_stay_on_child() {
    let (lc, _writer) = setup();
    lc.schedule_test_case(TestResult::new("x"));
    lc.start_test_case("x");
    lc.start_step("x", "outer", StepResult::new("outer"));

    let child = lc.clone();
    lc.spawn(move || {
        child.start_step_in_current("inner", StepResult::new("inner"));
        assert_eq!(child.current_step().as_deref(), Some("inner"));
    })
    .join()
    .unwrap();

    assert_eq!(lc.current_step().as_deref(), Some("outer"));
}

#[test]
fn test_attach_context_is_restored_on_drop() {
    let (lc, _writer) = setup();
    lc.schedule_test_case(TestResult::new("x"));
    lc.start_test_case("x");
    let captured = lc.context();

    let worker = lc.clone();
    thread::spawn(move || {
        assert!(worker.current_test_case().is_none());
        {
            let _guard = worker.attach_context(captured);
            assert_eq!(worker.current_test_case().as_deref(), Some("x"));
        }
        assert!(worker.current_test_case().is_none());
    })
    .join()
    .unwrap();
}

#[test]
fn test_propagate_wraps_closure_for_any_thread() {
    let (lc, _writer) = setup();
    lc.schedule_test_case(TestResult::new("x"));
    lc.start_test_case("x");

    let observer = lc.clone();
    let task = lc.propagate(move || observer.current_test_case_or_step());
    let seen = thread::spawn(task).join().unwrap();
    assert_eq!(seen.as_deref(), Some("x"));
}

#[test]
fn test_concurrent_updates_of_one_test_case() {
    const THREADS: usize = 8;
    let (lc, writer) = setup();
    lc.schedule_test_case(TestResult::new("shared"));
    lc.start_test_case("shared");

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let lc = lc.clone();
            thread::spawn(move || {
                lc.update_test_case("shared", |r| {
                    r.labels.push(Label::new("tag", format!("t{}", i)))
                });
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    lc.stop_test_case("shared");
    lc.write_test_case("shared");
    assert_eq!(writer.test_result("shared").unwrap().labels.len(), THREADS);
}

#[test]
fn test_lifecycles_do_not_share_context() {
    let (first, _) = setup();
    let (second, _) = setup();
    first.schedule_test_case(TestResult::new("a"));
    first.start_test_case("a");

    assert_eq!(first.current_test_case().as_deref(), Some("a"));
    assert!(second.current_test_case().is_none());
}
