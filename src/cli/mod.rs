use anyhow::{Context, Result};
use std::path::PathBuf;

use lovematch::core::{ChatMessage, Relationship, Sender, User};
use lovematch::views::{
    AdminController, AnalysisOutcome, AuthController, ChatController, ChatOutcome,
    DashboardController, HistoryController, OverrideForm,
};
use lovematch::{AppContext, Config, LoveMatchError};

pub use commands::{AdminCommands, Args, Commands, Toggle};

mod commands;

fn open_context(data_dir: Option<PathBuf>) -> Result<AppContext> {
    let config = Config::new(data_dir)?;
    AppContext::open(config).context("Failed to open the local store")
}

fn require_user(ctx: &AppContext) -> Result<User> {
    AuthController::new(ctx.clone())
        .current_user()
        .ok_or_else(|| LoveMatchError::NotAuthenticated.into())
}

fn print_relationship(rel: &Relationship) {
    let flag = if rel.overridden { " (overridden)" } else { "" };
    println!("💞 {} [{}]{}", rel.title(), rel.id, flag);
    println!("   Created: {}", rel.created_at.format("%Y-%m-%d %H:%M"));

    match &rel.compatibility {
        Some(c) => {
            println!("   Match: {}% - {}", c.match_percentage, c.compatibility_level);
            println!("   Advice: {}", c.advice);
            println!("   Strengths: {}", c.strengths);
            println!("   Areas to work on: {}", c.areas_to_work_on);
        }
        None => println!("   ⏳ Pending - Awaiting Analysis"),
    }

    if let Some(p) = &rel.prediction {
        println!("   🔮 Outlook: {} ({})", p.overall_outlook, p.emotional_trajectory);
        println!("   Short term: {}", p.short_term_prediction);
        println!("   Long term: {}", p.long_term_prediction);
        println!("   Challenges: {}", p.potential_challenges);
        println!("   Key advice: {}", p.key_advice);
    }
}

fn print_message(message: &ChatMessage) {
    let who = match message.sender {
        Sender::User => "🧑 You",
        Sender::Specialist => "💗 Specialist",
    };
    let tags: Vec<&str> = [message.sentiment.as_deref(), message.topic.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if tags.is_empty() {
        println!("{}: {}", who, message.text);
    } else {
        println!("{} [{}]: {}", who, tags.join(", "), message.text);
    }
}

fn print_outcome(outcome: &AnalysisOutcome) {
    print_relationship(outcome.relationship());
    if let Some(hint) = outcome.hint() {
        println!("ℹ️  {}", hint);
    }
}

pub async fn handle_register(name: String, password: String, data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let user = AuthController::new(ctx).register(&name, &password)?;
    println!("✅ Welcome, {}! You are logged in.", user.name);
    Ok(())
}

pub async fn handle_login(name: String, password: String, data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let user = AuthController::new(ctx).login(&name, &password)?;
    println!("✅ Logged in as {}", user.name);
    Ok(())
}

pub async fn handle_logout(data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    AuthController::new(ctx).logout()?;
    println!("👋 Logged out");
    Ok(())
}

pub async fn handle_whoami(data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    match AuthController::new(ctx).current_user() {
        Some(user) => println!("🧑 {} (last active {})", user.name, user.last_active.format("%Y-%m-%d %H:%M")),
        None => println!("Not logged in."),
    }
    Ok(())
}

pub async fn handle_check(your_name: String, partner_name: String, data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let user = require_user(&ctx)?;
    let dashboard = DashboardController::new(ctx, user);

    let outcome = dashboard.check_compatibility(&your_name, &partner_name).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn handle_predict(id: Option<String>, data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let user = require_user(&ctx)?;
    let dashboard = DashboardController::new(ctx, user);

    let outcome = dashboard.request_prediction(id.as_deref()).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn handle_chat(message: String, data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let user = require_user(&ctx)?;
    let chat = ChatController::new(ctx, user);

    match chat.send(&message).await? {
        ChatOutcome::Replied(reply) => print_message(&reply),
        ChatOutcome::AwaitingSpecialist => {
            println!("ℹ️  Manual mode - the specialist will reply soon. Use `lovematch watch` to wait for it.")
        }
        ChatOutcome::AgentFailed(message) => println!("⚠️  {}", message),
    }
    Ok(())
}

pub async fn handle_history(data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let user = require_user(&ctx)?;
    let history = HistoryController::new(ctx, user);

    let relationships = history.relationship_history();
    println!("📜 Analyses ({}):", relationships.len());
    for rel in &relationships {
        print_relationship(rel);
    }

    let messages = history.chat_history();
    println!();
    if messages.is_empty() {
        println!("💬 No conversations yet");
    } else {
        println!("💬 Chat History ({}):", messages.len());
        for message in &messages {
            print_message(message);
        }
    }
    Ok(())
}

pub async fn handle_watch(data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let user = require_user(&ctx)?;
    let dashboard = DashboardController::new(ctx.clone(), user.clone());
    let chat = ChatController::new(ctx.clone(), user);

    let mut ai_flag = ctx.watch_ai_enabled();
    let mut relationships = dashboard.watch();
    // Replies arrive inline while AI is on, so the transcript is only polled in manual mode.
    let mut messages = chat.watch_if_manual();
    let mut seen_messages = chat.messages().len();

    println!(
        "👀 Watching as {} (AI {}). Press Ctrl-C to stop.",
        dashboard.user().name,
        if ai_flag.latest() { "on" } else { "off" }
    );

    loop {
        let next_messages = async {
            match messages.as_mut() {
                Some(handle) => handle.changed().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            Some(enabled) = ai_flag.changed() => {
                println!("⚙️  AI responses are now {}", if enabled { "on" } else { "off" });
                messages = if enabled {
                    None
                } else {
                    chat.refresh();
                    seen_messages = chat.messages().len();
                    chat.watch_if_manual()
                };
            }
            Some(_) = relationships.changed() => {
                if dashboard.refresh() {
                    if let Some(rel) = dashboard.current() {
                        print_relationship(&rel);
                    }
                }
            }
            Some(latest) = next_messages => {
                for message in latest.iter().skip(seen_messages) {
                    print_message(message);
                }
                seen_messages = latest.len();
                chat.refresh();
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

pub async fn handle_admin(command: AdminCommands, data_dir: Option<PathBuf>) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let admin = AdminController::new(ctx.clone());

    match command {
        AdminCommands::Login { username, password } => {
            admin.login(&username, &password)?;
            println!("🛡️  Admin session started");
        }
        AdminCommands::Logout => match admin.logout()? {
            Some(user) => println!("👋 Admin session ended, back to {}", user.name),
            None => println!("👋 Admin session ended"),
        },
        AdminCommands::Status => {
            let snapshot = admin.snapshot()?;
            println!(
                "🤖 AI responses: {}",
                if snapshot.ai_enabled { "active" } else { "manual replies" }
            );
            println!("👥 Users: {}", snapshot.stats.users);
            println!("💞 Relationships: {} ({} pending)", snapshot.stats.relationships, snapshot.stats.pending);
            println!("💬 Messages: {}", snapshot.stats.messages);
        }
        AdminCommands::Ai { state } => {
            admin.set_ai_enabled(state == Toggle::On)?;
            match state {
                Toggle::On => println!("✅ Agents are actively responding"),
                Toggle::Off => println!("✅ Manual mode - you are the Love Specialist"),
            }
        }
        AdminCommands::Users => {
            let snapshot = admin.snapshot()?;
            println!("👥 Registered Users ({}):", snapshot.users.len());
            for user in &snapshot.users {
                println!(
                    "  {} [{}] registered {}, last active {}",
                    user.name,
                    user.id,
                    user.registered_at.format("%Y-%m-%d %H:%M"),
                    user.last_active.format("%Y-%m-%d %H:%M")
                );
            }
        }
        AdminCommands::Relationships => {
            let snapshot = admin.snapshot()?;
            println!("💞 Relationships ({}):", snapshot.relationships.len());
            for rel in &snapshot.relationships {
                println!("  by {}", snapshot.user_name(&rel.user_id));
                print_relationship(rel);
            }
        }
        AdminCommands::Chats => {
            let snapshot = admin.snapshot()?;
            if snapshot.chats.is_empty() {
                println!("💬 No chats yet");
            }
            for (user_id, messages) in &snapshot.chats {
                println!("💬 {} [{}] - {} messages", snapshot.user_name(user_id), user_id, messages.len());
                for message in messages {
                    print!("  ");
                    print_message(message);
                }
            }
        }
        AdminCommands::Reply { user_id, text } => {
            admin.reply(&user_id, &text)?;
            println!("✅ Reply sent");
        }
        AdminCommands::Override {
            relationship_id,
            percentage,
            level,
            advice,
            strengths,
            areas,
            short_term,
            long_term,
            challenges,
            trajectory,
            key_advice,
            outlook,
        } => {
            let current = ctx
                .repos
                .relationships
                .get(&relationship_id)
                .ok_or_else(|| LoveMatchError::RelationshipNotFound(relationship_id.clone()))?;

            let mut form = OverrideForm::from_relationship(&current);
            let edits = [
                (&mut form.match_percentage, percentage),
                (&mut form.compatibility_level, level),
                (&mut form.advice, advice),
                (&mut form.strengths, strengths),
                (&mut form.areas_to_work_on, areas),
                (&mut form.short_term_prediction, short_term),
                (&mut form.long_term_prediction, long_term),
                (&mut form.potential_challenges, challenges),
                (&mut form.emotional_trajectory, trajectory),
                (&mut form.key_advice, key_advice),
                (&mut form.overall_outlook, outlook),
            ];
            for (field, value) in edits {
                if let Some(value) = value {
                    *field = value;
                }
            }

            let updated = admin.override_relationship(&relationship_id, &form)?;
            println!("✅ Override saved");
            print_relationship(&updated);
        }
        AdminCommands::Watch => {
            let mut snapshots = admin.watch()?;
            println!("👀 Watching store totals. Press Ctrl-C to stop.");
            loop {
                tokio::select! {
                    Some(snapshot) = snapshots.changed() => {
                        println!(
                            "📊 users {} | relationships {} ({} pending) | messages {} | AI {}",
                            snapshot.stats.users,
                            snapshot.stats.relationships,
                            snapshot.stats.pending,
                            snapshot.stats.messages,
                            if snapshot.ai_enabled { "on" } else { "off" }
                        );
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }
    Ok(())
}
