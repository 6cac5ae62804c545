use std::time::Duration;

use taskstream_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), TaskError> {
    let client = TaskClient::new(ClientConfig::from_env())?;

    let instruction = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let instruction = if instruction.is_empty() {
        "Open example.com and summarize the page".to_string()
    } else {
        instruction
    };

    let run = client.start(TaskRequest::basic(instruction).max_steps(20));

    let mut printed = 0;
    while !run.state().is_terminal() {
        for entry in &run.log()[printed..] {
            println!("[{}] {}", entry.severity, entry.message);
            printed += 1;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    for entry in &run.log()[printed..] {
        println!("[{}] {}", entry.severity, entry.message);
    }

    let progress = run.progress();
    match progress.terminal {
        Some(result) => println!(
            "finished (success={}) after step {}/{}: {}",
            result.success, progress.current_step, progress.max_steps, result.summary
        ),
        None => println!("run ended as {:?} with no terminal result", run.state()),
    }
    Ok(())
}
