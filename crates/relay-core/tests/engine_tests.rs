mod common;

use std::sync::Arc;

use common::{
    create_fake_engine, next_process, project_dir, test_builder, wait_for, wait_for_status,
    FakeSpawner,
};
use relay_core::{
    params::{CreatePlan, StepCreate},
    ChannelNotifier, PlanEvent, PlanStatus, StepStatus, StepType,
};
use tempfile::TempDir;

fn shell_plan(project_path: String, commands: &[&str]) -> CreatePlan {
    CreatePlan {
        title: "Shell Plan".to_string(),
        description: None,
        project_path: Some(project_path),
        steps: commands
            .iter()
            .enumerate()
            .map(|(i, cmd)| StepCreate::shell(format!("step {i}"), *cmd))
            .collect(),
    }
}

#[tokio::test]
async fn test_shell_step_success_completes_plan() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let project = project_dir(&temp_dir);
    let plan = engine
        .create(&shell_plan(project.clone(), &["echo hello \"big world\""]))
        .expect("Failed to create plan");

    assert!(engine.execute(&plan.id));
    let process = next_process(&mut started).await;
    assert_eq!(process.request.program, "echo");
    assert_eq!(process.request.args, vec!["hello", "big world"]);
    assert_eq!(process.request.cwd.to_string_lossy(), project);

    process.stdout("hello big world\n");
    process.exit(0);

    let done = wait_for_status(&engine, &plan.id, PlanStatus::Completed).await;
    assert_eq!(done.steps[0].status, StepStatus::Completed);
    assert_eq!(done.steps[0].output.as_deref(), Some("hello big world\n"));
    assert_eq!(engine.live_processes(), 0);
    assert_eq!(engine.stats().total_steps_executed, 1);
}

#[tokio::test]
async fn test_output_is_appended_while_running() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (spawner, mut started) = FakeSpawner::new();
    let (notifier, mut events) = ChannelNotifier::new();
    let engine = test_builder(&temp_dir)
        .with_spawner(Arc::new(spawner))
        .with_notifier(Arc::new(notifier))
        .build()
        .await
        .unwrap();
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["cargo build"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let process = next_process(&mut started).await;
    process.stdout("Compiling relay\n");

    let running = wait_for(&engine, &plan.id, |p| p.steps[0].output.is_some()).await;
    assert_eq!(running.status, PlanStatus::Executing);
    assert_eq!(running.steps[0].status, StepStatus::Running);
    assert_eq!(running.steps[0].output.as_deref(), Some("Compiling relay\n"));

    process.stdout("Finished\n");
    process.exit(0);
    let done = wait_for_status(&engine, &plan.id, PlanStatus::Completed).await;
    assert_eq!(
        done.steps[0].output.as_deref(),
        Some("Compiling relay\nFinished\n")
    );

    let mut seen = Vec::new();
    while let Ok((event, _)) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen.iter().filter(|e| **e == PlanEvent::StepOutput).count(),
        2
    );
    assert_eq!(seen.last(), Some(&PlanEvent::Completed));
}

#[tokio::test]
async fn test_non_zero_exit_fails_with_stderr() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["cargo test", "echo never"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let process = next_process(&mut started).await;
    process.stderr("test failed\n");
    process.exit(101);

    let failed = wait_for_status(&engine, &plan.id, PlanStatus::Failed).await;
    assert_eq!(failed.error.as_deref(), Some("test failed\n"));
    assert_eq!(failed.steps[0].status, StepStatus::Failed);
    assert_eq!(failed.steps[0].error.as_deref(), Some("test failed\n"));
    assert_eq!(failed.steps[1].status, StepStatus::Pending);
    assert_eq!(engine.stats().failed_plans, 1);
}

#[tokio::test]
async fn test_non_zero_exit_without_stderr_reports_code() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["false"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    next_process(&mut started).await.exit(2);

    let failed = wait_for_status(&engine, &plan.id, PlanStatus::Failed).await;
    assert_eq!(failed.error.as_deref(), Some("Exit code: 2"));
}

#[tokio::test]
async fn test_rejected_command_never_spawns() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["rm -rf build"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let failed = wait_for_status(&engine, &plan.id, PlanStatus::Failed).await;
    assert_eq!(
        failed.error.as_deref(),
        Some("Command validation failed: Command 'rm' is not allowed")
    );
    assert!(started.try_recv().is_err());
}

#[tokio::test]
async fn test_shell_metacharacters_are_rejected() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["echo hi; rm -rf /"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let failed = wait_for_status(&engine, &plan.id, PlanStatus::Failed).await;
    assert!(failed
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Command validation failed:")));
    assert!(started.try_recv().is_err());
}

#[tokio::test]
async fn test_project_path_outside_roots_is_rejected() {
    let (_temp_dir, engine, mut started) = create_fake_engine().await;
    let outside = TempDir::new().expect("Failed to create temp dir");
    let plan = engine
        .create(&shell_plan(
            outside.path().to_string_lossy().into_owned(),
            &["echo hi"],
        ))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let failed = wait_for_status(&engine, &plan.id, PlanStatus::Failed).await;
    assert!(failed
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Path validation failed:")));
    assert!(started.try_recv().is_err());
}

#[tokio::test]
async fn test_spawn_failure_fails_plan() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let engine = test_builder(&temp_dir)
        .with_spawner(Arc::new(FakeSpawner::failing("no such program")))
        .build()
        .await
        .unwrap();
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["git status"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let failed = wait_for_status(&engine, &plan.id, PlanStatus::Failed).await;
    assert!(failed
        .error
        .as_deref()
        .is_some_and(|e| e.contains("no such program")));
    assert_eq!(engine.live_processes(), 0);
}

#[tokio::test]
async fn test_pause_kills_process_and_resume_restarts_step() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["cargo build", "echo done"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let first_run = next_process(&mut started).await;
    first_run.stdout("partial\n");
    wait_for(&engine, &plan.id, |p| p.steps[0].output.is_some()).await;

    assert!(engine.pause(&plan.id));
    assert!(first_run.was_killed());
    assert_eq!(engine.live_processes(), 0);

    // The killed run's exit must not fail the step.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let paused = engine.get(&plan.id).unwrap();
    assert_eq!(paused.status, PlanStatus::Paused);
    assert_eq!(paused.steps[0].status, StepStatus::Running);

    assert!(engine.resume(&plan.id));
    let second_run = next_process(&mut started).await;
    assert_eq!(second_run.request.program, "cargo");
    let restarted = engine.get(&plan.id).unwrap();
    assert_eq!(restarted.steps[0].status, StepStatus::Running);
    assert!(restarted.steps[0].output.is_none());

    second_run.stdout("built\n");
    second_run.exit(0);
    let third_run = next_process(&mut started).await;
    assert_eq!(third_run.request.program, "echo");
    third_run.exit(0);

    let done = wait_for_status(&engine, &plan.id, PlanStatus::Completed).await;
    assert_eq!(done.steps[0].output.as_deref(), Some("built\n"));
}

#[tokio::test]
async fn test_cancel_kills_running_process() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["cargo build"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let process = next_process(&mut started).await;
    assert!(engine.cancel(&plan.id));
    assert!(process.was_killed());

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let cancelled = engine.get(&plan.id).unwrap();
    assert_eq!(cancelled.status, PlanStatus::Failed);
    assert_eq!(cancelled.error.as_deref(), Some("Cancelled by user"));
    assert_eq!(cancelled.steps[0].error.as_deref(), Some("Cancelled"));
    assert_eq!(engine.live_processes(), 0);
    assert_eq!(engine.stats().failed_plans, 1);
}

#[tokio::test]
async fn test_external_completion_kills_shell_process() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&CreatePlan {
            steps: vec![
                StepCreate::shell("serve", "npm start"),
                StepCreate::new("check", StepType::Manual),
            ],
            ..shell_plan(project_dir(&temp_dir), &[])
        })
        .unwrap();

    assert!(engine.execute(&plan.id));
    let process = next_process(&mut started).await;
    assert!(engine.step_complete(&plan.id, &plan.steps[0].id, Some("stopped".into())));
    assert!(process.was_killed());

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let state = engine.get(&plan.id).unwrap();
    assert_eq!(state.status, PlanStatus::Executing);
    assert_eq!(state.steps[0].status, StepStatus::Completed);
    assert_eq!(state.steps[0].output.as_deref(), Some("stopped"));
    assert_eq!(state.steps[1].status, StepStatus::Running);
}

#[tokio::test]
async fn test_dependent_shell_steps_run_in_order() {
    let (temp_dir, engine, mut started) = create_fake_engine().await;
    let plan = engine
        .create(&CreatePlan {
            steps: vec![
                StepCreate::shell("build", "cargo build"),
                StepCreate::shell("test", "cargo test").depends_on([0]),
            ],
            ..shell_plan(project_dir(&temp_dir), &[])
        })
        .unwrap();

    assert!(engine.execute(&plan.id));
    let build = next_process(&mut started).await;
    assert_eq!(build.request.args, vec!["build"]);
    assert!(started.try_recv().is_err());
    build.exit(0);

    let test = next_process(&mut started).await;
    assert_eq!(test.request.args, vec!["test"]);
    test.exit(0);

    wait_for_status(&engine, &plan.id, PlanStatus::Completed).await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_process_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let engine = test_builder(&temp_dir).build().await.unwrap();
    let plan = engine
        .create(&shell_plan(project_dir(&temp_dir), &["echo hello", "pwd"]))
        .unwrap();

    assert!(engine.execute(&plan.id));
    let done = wait_for(&engine, &plan.id, |p| p.status.is_terminal()).await;

    assert_eq!(done.status, PlanStatus::Completed, "error: {:?}", done.error);
    assert_eq!(done.steps[0].output.as_deref(), Some("hello\n"));
    assert!(done.steps[1]
        .output
        .as_deref()
        .is_some_and(|out| out.trim_end().ends_with("project")));
}
