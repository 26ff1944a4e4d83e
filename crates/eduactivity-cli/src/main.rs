//! EduActivity CLI - command line access to the provider marketplace.
//!
//! Log in once and the tokens live in the OS keychain; every later command
//! reuses them and refreshes the access token when it expires.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use eduactivity_core::models::{
    BookingStatus, PasswordChange, PricingDraft, PricingType, ProfileUpdate, ProviderDraft,
    RegistrationRequest, SearchParams, SearchSort, ServiceDraft, ServiceType, UserType,
};
use eduactivity_core::{
    ApiError, Config, KeyringCredentialStore, SessionClient, SessionExpiryHandler, SessionState,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "eduactivity", version, about = "Find and manage tutors, coaching centres and activity providers")]
struct Cli {
    /// API base URL (overrides config file)
    #[arg(long, env = "EDUACTIVITY_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store tokens in the keychain
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget stored tokens
    Logout,
    /// Create an account (log in afterwards)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, value_parser = parse_user_type, default_value = "student")]
        user_type: UserType,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show whether a session is stored
    Status,
    /// Show the logged-in user's profile
    Whoami,
    /// Change the account password
    ChangePassword,
    /// Update profile fields; omitted fields are left unchanged
    UpdateProfile(ProfileArgs),
    /// Search approved providers
    Search {
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        subcategory: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        max_price: Option<String>,
        #[arg(long)]
        sort: Option<SearchSort>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one provider
    Provider { id: String },
    /// Show your own provider profile
    MyProvider,
    /// Create or update your own provider profile
    SaveMyProvider(ProviderArgs),
    /// Create a provider listing
    CreateProvider(ProviderArgs),
    /// Replace a provider listing
    UpdateProvider {
        id: String,
        #[command(flatten)]
        fields: ProviderArgs,
    },
    /// List your services
    Services,
    /// Add a service
    CreateService(ServiceArgs),
    /// Replace a service
    UpdateService {
        id: String,
        #[command(flatten)]
        fields: ServiceArgs,
    },
    /// List pricing for a service
    Pricing { service_id: String },
    /// Add a pricing entry to a service
    CreatePricing {
        service_id: String,
        #[command(flatten)]
        fields: PricingArgs,
    },
    /// Replace a pricing entry
    UpdatePricing {
        id: String,
        #[command(flatten)]
        fields: PricingArgs,
    },
    /// Delete a service
    DeleteService { id: String },
    /// Delete a pricing entry
    DeletePricing { id: String },
    /// List bookings for your services
    Bookings,
    /// Change a booking's status
    BookingStatus { id: String, status: BookingStatus },
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    school_name: Option<String>,
    #[arg(long)]
    class_name: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

impl From<ProfileArgs> for ProfileUpdate {
    fn from(args: ProfileArgs) -> Self {
        ProfileUpdate {
            first_name: args.first_name,
            last_name: args.last_name,
            phone: args.phone,
            school_name: args.school_name,
            class_name: args.class_name,
            address: args.address,
        }
    }
}

#[derive(Args)]
struct ProviderArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    category: String,
    #[arg(long)]
    subcategory: Option<String>,
    #[arg(long)]
    address: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
    #[arg(long)]
    contact_phone: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    pricing_info: Option<String>,
}

impl From<ProviderArgs> for ProviderDraft {
    fn from(args: ProviderArgs) -> Self {
        ProviderDraft {
            name: args.name,
            description: args.description,
            category: args.category,
            subcategory: args.subcategory,
            address: args.address,
            contact_email: args.contact_email,
            contact_phone: args.contact_phone,
            website: args.website,
            pricing_info: args.pricing_info,
        }
    }
}

#[derive(Args)]
struct ServiceArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long = "type", value_parser = parse_service_type, default_value = "individual")]
    service_type: ServiceType,
    #[arg(long, default_value_t = 1)]
    hours: u32,
    #[arg(long, default_value_t = 0)]
    minutes: u32,
    #[arg(long, default_value_t = 1)]
    max_participants: u32,
    /// Hide the service from search
    #[arg(long)]
    inactive: bool,
}

impl From<ServiceArgs> for ServiceDraft {
    fn from(args: ServiceArgs) -> Self {
        ServiceDraft {
            name: args.name,
            description: args.description,
            service_type: args.service_type,
            duration_hours: args.hours,
            duration_minutes: args.minutes,
            max_participants: args.max_participants,
            is_active: !args.inactive,
        }
    }
}

#[derive(Args)]
struct PricingArgs {
    /// Decimal amount, e.g. 25.00
    #[arg(long)]
    price: String,
    #[arg(long = "type", value_parser = parse_pricing_type, default_value = "per-session")]
    pricing_type: PricingType,
    #[arg(long, default_value = "USD")]
    currency: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, default_value_t = 1)]
    min_sessions: u32,
    #[arg(long)]
    max_sessions: Option<u32>,
    #[arg(long)]
    inactive: bool,
}

impl From<PricingArgs> for PricingDraft {
    fn from(args: PricingArgs) -> Self {
        PricingDraft {
            currency: args.currency,
            description: args.description,
            min_sessions: args.min_sessions,
            max_sessions: args.max_sessions,
            is_active: !args.inactive,
            ..PricingDraft::new(args.pricing_type, args.price)
        }
    }
}

fn parse_service_type(s: &str) -> Result<ServiceType, String> {
    match s.to_ascii_lowercase().as_str() {
        "individual" => Ok(ServiceType::Individual),
        "group" => Ok(ServiceType::Group),
        "package" => Ok(ServiceType::Package),
        "consultation" => Ok(ServiceType::Consultation),
        "assessment" => Ok(ServiceType::Assessment),
        other => Err(format!("unknown service type: {}", other)),
    }
}

fn parse_pricing_type(s: &str) -> Result<PricingType, String> {
    match s.to_ascii_lowercase().replace('-', "_").as_str() {
        "per_session" => Ok(PricingType::PerSession),
        "per_hour" => Ok(PricingType::PerHour),
        "per_participant" => Ok(PricingType::PerParticipant),
        "fixed" => Ok(PricingType::Fixed),
        "package" => Ok(PricingType::Package),
        other => Err(format!("unknown pricing type: {}", other)),
    }
}

fn parse_user_type(s: &str) -> Result<UserType, String> {
    match s.to_ascii_lowercase().as_str() {
        "student" => Ok(UserType::Student),
        "parent" => Ok(UserType::Parent),
        "provider" => Ok(UserType::Provider),
        other => Err(format!("unknown account type: {}", other)),
    }
}

/// Tells the user to log in again once the session can't be refreshed.
struct LoginPrompt {
    registering: bool,
}

impl SessionExpiryHandler for LoginPrompt {
    fn on_session_expired(&self) {
        eprintln!("Session expired. Run `eduactivity login` to sign in again.");
    }

    fn in_registration_flow(&self) -> bool {
        self.registering
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prefer the upstream error payload over our own message when there is one
fn describe(err: ApiError) -> anyhow::Error {
    match err.payload() {
        Some(payload) => anyhow::anyhow!("{}\n{}", err, payload),
        None => anyhow::Error::new(err),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_url = Some(url);
    }

    let session_config = config.session_config();
    info!(base_url = %session_config.base_url, "Using API");

    let store = Arc::new(KeyringCredentialStore::new(config.keyring_service()));
    let handler = Arc::new(LoginPrompt {
        registering: matches!(cli.command, Command::Register { .. }),
    });
    let client = SessionClient::new(session_config, store, handler)
        .context("Failed to create HTTP client")?;

    run(cli.command, &client, &mut config).await
}

async fn run(command: Command, client: &SessionClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let user = client.login(&email, &password).await.map_err(describe)?;
            println!("Logged in as {} ({})", user.full_name(), user.email);

            config.last_email = Some(email);
            config.save().context("Failed to save config")?;
        }
        Command::Logout => {
            client.logout()?;
            println!("Logged out");
        }
        Command::Register {
            email,
            first_name,
            last_name,
            user_type,
            phone,
        } => {
            let password = rpassword::prompt_password("Password: ")?;
            let password_confirm = rpassword::prompt_password("Confirm password: ")?;
            let registration = RegistrationRequest {
                email,
                password,
                password_confirm,
                first_name,
                last_name,
                user_type,
                phone,
                ..Default::default()
            };
            let result = client.register(&registration).await.map_err(describe)?;
            println!(
                "{}",
                result
                    .message
                    .unwrap_or_else(|| "Registered. Please log in.".to_string())
            );
        }
        Command::Status => match client.session_state()? {
            SessionState::Anonymous => println!("Not logged in"),
            SessionState::Authenticated { refreshable } => {
                println!("Logged in (refreshable: {})", refreshable)
            }
        },
        Command::Whoami => print_json(&client.current_user().await.map_err(describe)?)?,
        Command::ChangePassword => {
            let change = PasswordChange {
                old_password: rpassword::prompt_password("Current password: ")?,
                new_password: rpassword::prompt_password("New password: ")?,
                new_password_confirm: rpassword::prompt_password("Confirm new password: ")?,
            };
            client.change_password(&change).await.map_err(describe)?;
            println!("Password changed");
        }
        Command::UpdateProfile(fields) => {
            let user = client
                .update_profile(&fields.into())
                .await
                .map_err(describe)?;
            print_json(&user)?
        }
        Command::Search {
            query,
            category,
            subcategory,
            location,
            max_price,
            sort,
            page,
        } => {
            let params = SearchParams {
                q: query,
                category,
                subcategory,
                location,
                max_price,
                sort,
                page,
                ..Default::default()
            };
            let results = client.search_providers(&params).await.map_err(describe)?;
            println!("{} provider(s)", results.count);
            for provider in &results.results {
                println!(
                    "  {}  {} [{}] - {}",
                    provider.id, provider.name, provider.category, provider.address
                );
            }
            if results.has_more() {
                println!("More results available (use --page)");
            }
        }
        Command::Provider { id } => print_json(&client.provider(&id).await.map_err(describe)?)?,
        Command::MyProvider => print_json(&client.my_provider().await.map_err(describe)?)?,
        Command::SaveMyProvider(fields) => {
            print_json(&client.save_my_provider(&fields.into()).await.map_err(describe)?)?
        }
        Command::CreateProvider(fields) => {
            print_json(&client.create_provider(&fields.into()).await.map_err(describe)?)?
        }
        Command::UpdateProvider { id, fields } => print_json(
            &client
                .update_provider(&id, &fields.into())
                .await
                .map_err(describe)?,
        )?,
        Command::Services => print_json(&client.services().await.map_err(describe)?)?,
        Command::CreateService(fields) => {
            print_json(&client.create_service(&fields.into()).await.map_err(describe)?)?
        }
        Command::UpdateService { id, fields } => print_json(
            &client
                .update_service(&id, &fields.into())
                .await
                .map_err(describe)?,
        )?,
        Command::Pricing { service_id } => {
            print_json(&client.pricing_for_service(&service_id).await.map_err(describe)?)?
        }
        Command::CreatePricing { service_id, fields } => print_json(
            &client
                .create_pricing(&service_id, &fields.into())
                .await
                .map_err(describe)?,
        )?,
        Command::UpdatePricing { id, fields } => print_json(
            &client
                .update_pricing(&id, &fields.into())
                .await
                .map_err(describe)?,
        )?,
        Command::DeleteService { id } => {
            client.delete_service(&id).await.map_err(describe)?;
            println!("Deleted service {}", id);
        }
        Command::DeletePricing { id } => {
            client.delete_pricing(&id).await.map_err(describe)?;
            println!("Deleted pricing {}", id);
        }
        Command::Bookings => {
            for booking in client.bookings().await.map_err(describe)? {
                println!(
                    "  {}  {} {}  {}  {}",
                    booking.id,
                    booking.booking_date,
                    booking.booking_time.format("%H:%M"),
                    booking.service_name.as_deref().unwrap_or(&booking.service),
                    booking.status.as_str()
                );
            }
        }
        Command::BookingStatus { id, status } => {
            let booking = client
                .update_booking_status(&id, status)
                .await
                .map_err(describe)?;
            println!("Booking {} is now {}", booking.id, booking.status.as_str());
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;

    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
