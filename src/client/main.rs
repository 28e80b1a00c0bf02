//! Maternal Forum Command Line Interface
//!
//! Wires configuration, logging, local storage, the configured backend and
//! the forum controller together for manual use.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use maternal_forum::client::{preorder, Backend, ForumController, LocalStore, PostFilter, SessionStore, SortOrder};
use maternal_forum::shared::{AppConfig, CommentId, NewPost, PostId, ProfileFields};

/// Command-line interface commands
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Posts {
        subtopic: Option<String>,
        sort: SortOrder,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    WhoAmI,
    SignUp {
        email: String,
        password: String,
        first_name: Option<String>,
        last_name: Option<String>,
    },
    Comment {
        post_id: PostId,
        content: String,
        reply_to: Option<CommentId>,
    },
    Like {
        post_id: PostId,
    },
    Post {
        subtopic: String,
        title: String,
        content: String,
    },
}

const USAGE: &str = "Usage: forum <command>

Commands:
  posts [--subtopic <name>] [--sort recent|liked]
  login <email> <password>
  logout
  whoami
  signup <email> <password> [first_name] [last_name]
  comment <post_id> <content> [--reply-to <comment_id>]
  like <post_id>
  post <subtopic> <title> <content>";

/// Parse arguments (without the program name) into a Command
fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(name) = args.first() else {
        return Err(USAGE.to_string());
    };
    let rest = &args[1..];

    match name.as_str() {
        "posts" => {
            let mut subtopic = None;
            let mut sort = SortOrder::default();
            let mut iter = rest.iter();
            while let Some(flag) = iter.next() {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a value", flag))?;
                match flag.as_str() {
                    "--subtopic" if value.eq_ignore_ascii_case("all") => subtopic = None,
                    "--subtopic" => subtopic = Some(value.clone()),
                    "--sort" => sort = value.parse::<SortOrder>().map_err(|e| e.to_string())?,
                    other => return Err(format!("Unknown option '{}'", other)),
                }
            }
            Ok(Command::Posts { subtopic, sort })
        }

        "login" => match rest {
            [email, password] => Ok(Command::Login {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => Err("login requires email and password".to_string()),
        },

        "logout" => Ok(Command::Logout),

        "whoami" => Ok(Command::WhoAmI),

        "signup" => {
            if rest.len() < 2 || rest.len() > 4 {
                return Err("signup requires email and password, optionally first and last name".to_string());
            }
            Ok(Command::SignUp {
                email: rest[0].clone(),
                password: rest[1].clone(),
                first_name: rest.get(2).cloned(),
                last_name: rest.get(3).cloned(),
            })
        }

        "comment" => match rest {
            [post_id, content] => Ok(Command::Comment {
                post_id: PostId::new(post_id.as_str()),
                content: content.clone(),
                reply_to: None,
            }),
            [post_id, content, flag, parent] if flag == "--reply-to" => Ok(Command::Comment {
                post_id: PostId::new(post_id.as_str()),
                content: content.clone(),
                reply_to: Some(CommentId::new(parent.as_str())),
            }),
            _ => Err("comment requires post id and content, optionally --reply-to <comment_id>".to_string()),
        },

        "like" => match rest {
            [post_id] => Ok(Command::Like {
                post_id: PostId::new(post_id.as_str()),
            }),
            _ => Err("like requires a post id".to_string()),
        },

        "post" => match rest {
            [subtopic, title, content] => Ok(Command::Post {
                subtopic: subtopic.clone(),
                title: title.clone(),
                content: content.clone(),
            }),
            _ => Err("post requires subtopic, title and content".to_string()),
        },

        "help" | "--help" | "-h" => Err(USAGE.to_string()),

        other => Err(format!("Unknown command '{}'\n\n{}", other, USAGE)),
    }
}

async fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let storage = LocalStore::open(&config.resolved_data_dir()).await?;
    let sessions = Arc::new(SessionStore::open(storage).await?);
    let backend = Arc::new(Backend::from_config(&config, sessions)?);
    let forum = ForumController::new(backend.clone(), config.rollback_on_failure);

    match command {
        Command::Posts { subtopic, sort } => {
            let report = forum.load().await?;
            let filter = PostFilter { subtopic, sort };
            for post in forum.posts(&filter).await {
                println!(
                    "[{}] {} ({}) by {} - {} likes",
                    post.id,
                    post.title,
                    post.subtopic,
                    post.author.display_name(),
                    post.likes
                );
                println!("    {}", post.content);
                let threads = forum.threads(&post.id).await.unwrap_or_default();
                for (depth, node) in preorder(&threads) {
                    println!(
                        "{}- [{}] {}: {}",
                        "    ".repeat(depth + 1),
                        node.comment.id,
                        node.comment.author.display_name(),
                        node.comment.content
                    );
                }
            }
            for (post_id, error) in &report.failed {
                eprintln!("Comments for post {} could not be loaded: {}", post_id, error);
            }
        }

        Command::Login { email, password } => {
            let session = backend.sign_in(&email, &password).await?;
            println!("Logged in as {}", session.user.email);
        }

        Command::Logout => {
            backend.sign_out().await?;
            println!("Logged out");
        }

        Command::WhoAmI => match backend.fetch_profile().await? {
            Some(user) => println!(
                "{} <{}>",
                user.full_name().unwrap_or_else(|| user.id.to_string()),
                user.email
            ),
            None => println!("Not logged in"),
        },

        Command::SignUp {
            email,
            password,
            first_name,
            last_name,
        } => {
            let profile = ProfileFields {
                first_name,
                last_name,
                phone: None,
            };
            let user = backend.sign_up(&email, &password, &profile).await?;
            println!("Registered {}; log in to continue", user.email);
        }

        Command::Comment {
            post_id,
            content,
            reply_to,
        } => {
            let comment = forum.submit_comment(&post_id, reply_to.as_ref(), &content).await?;
            println!("Comment {} added to post {}", comment.id, post_id);
        }

        Command::Like { post_id } => {
            forum.load().await?;
            let likes = forum.like(&post_id).await?;
            println!("Post {} now has {} likes", post_id, likes);
        }

        Command::Post {
            subtopic,
            title,
            content,
        } => {
            let post = forum.create_post(NewPost::new(title, content, subtopic)).await?;
            println!("Created post {}", post.id);
        }
    }

    forum.close();
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "maternal_forum=info".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_posts_flags() {
        assert_eq!(
            parse_args(&args(&["posts", "--subtopic", "Nutrition", "--sort", "liked"])).unwrap(),
            Command::Posts {
                subtopic: Some("Nutrition".to_string()),
                sort: SortOrder::MostLiked,
            }
        );
        assert_eq!(
            parse_args(&args(&["posts", "--subtopic", "all"])).unwrap(),
            Command::Posts {
                subtopic: None,
                sort: SortOrder::Recent,
            }
        );
        assert!(parse_args(&args(&["posts", "--sort"])).is_err());
        assert!(parse_args(&args(&["posts", "--sort", "oldest"])).is_err());
    }

    #[test]
    fn test_parse_comment_reply() {
        assert_eq!(
            parse_args(&args(&["comment", "7", "Same here", "--reply-to", "12"])).unwrap(),
            Command::Comment {
                post_id: PostId::new("7"),
                content: "Same here".to_string(),
                reply_to: Some(CommentId::new("12")),
            }
        );
        assert!(parse_args(&args(&["comment", "7"])).is_err());
    }

    #[test]
    fn test_parse_signup_and_unknown() {
        assert_eq!(
            parse_args(&args(&["signup", "ada@example.com", "pw", "Ada"])).unwrap(),
            Command::SignUp {
                email: "ada@example.com".to_string(),
                password: "pw".to_string(),
                first_name: Some("Ada".to_string()),
                last_name: None,
            }
        );
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }
}
