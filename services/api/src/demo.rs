use crate::infra::{BufferedSink, LoggingNotifier};
use chrono::{Duration, TimeZone, Utc};
use clap::Args;
use equipment_trust::config::TrustEngineConfig;
use equipment_trust::error::AppError;
use equipment_trust::trust::{
    Clock, ContactInfo, FixedClock, Lead, LeadId, LeadStatus, Listing, ListingId, ListingStatus,
    MemoryCache, MemoryStore, Owner, ReviewRating, ReviewSubmission, Reviewer, TrustEngine,
    TrustEvent, UserId, VerificationStatus,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

const RATINGS: [ReviewRating; 4] = [
    ReviewRating::Excellent,
    ReviewRating::Good,
    ReviewRating::Excellent,
    ReviewRating::Average,
];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of rental enquiries to replay for the demo owner
    #[arg(long, default_value_t = 12)]
    pub(crate) leads: u32,
    /// Every n-th enquiry goes unanswered (0 answers all of them)
    #[arg(long, default_value_t = 4)]
    pub(crate) ignore_every: u32,
    /// Approve the owner's business verification at the end of the run
    #[arg(long)]
    pub(crate) verify: bool,
    /// Print the final metrics as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

type DemoEngine = TrustEngine<MemoryStore, MemoryCache>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = Utc
        .with_ymd_and_hms(2025, 3, 1, 8, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let clock = Arc::new(FixedClock::new(start));
    let store = Arc::new(MemoryStore::default());
    let sink = Arc::new(BufferedSink::default());
    let engine = TrustEngine::new(
        store.clone(),
        Arc::new(MemoryCache::new(clock.clone())),
        clock.clone(),
        sink.clone(),
        Arc::new(LoggingNotifier),
        &TrustEngineConfig::default(),
    );

    let owner_id = UserId::new("owner-demo");
    let mut owner = Owner {
        id: owner_id.clone(),
        created_at: start - Duration::days(180),
        business_verification: VerificationStatus::Pending,
        identity_verified: true,
    };
    store.put_owner(owner.clone());

    for listing in demo_listings(&owner_id) {
        let listing_id = listing.id.clone();
        store.put_listing(listing);
        engine.events.dispatch(TrustEvent::ListingCreated { listing_id });
    }

    for index in 0..args.leads {
        let lead = demo_lead(&owner_id, index, clock.now());
        let lead_id = lead.id.clone();
        store.put_lead(lead);
        engine.events.dispatch(TrustEvent::LeadCreated {
            lead_id: lead_id.clone(),
        });

        let ignored = args.ignore_every > 0 && (index + 1) % args.ignore_every == 0;
        if !ignored {
            let response_minutes = 20 * i64::from(index % 3 + 1);
            engine.events.dispatch(TrustEvent::LeadResponded {
                lead_id,
                responded_at: clock.now() + Duration::minutes(response_minutes),
            });
        }
        clock.advance(Duration::hours(5));
    }

    clock.advance(Duration::days(8));
    let report = engine.process_pending_review_requests()?;
    println!("Equipment trust demo");
    println!(
        "  Review invitations: {} due, {} sent, {} failed",
        report.due, report.notified, report.failed
    );

    let mut accepted = 0;
    for index in 0..args.leads {
        let submission = ReviewSubmission {
            lead_id: LeadId::new(format!("lead-{index:03}")),
            reviewer: Reviewer {
                user_id: UserId::new(format!("renter-{index:03}")),
                verified_phone: Some(demo_phone(index)),
                verified_email: None,
            },
            rating: RATINGS[index as usize % RATINGS.len()],
            title: None,
            comment: Some("Machine arrived serviced and on schedule.".to_string()),
        };
        match engine.reviews.submit_review(submission) {
            Ok(_) => accepted += 1,
            Err(err) => println!("  Review for lead-{index:03} rejected: {err}"),
        }
    }
    println!("  Reviews accepted: {accepted}");
    drain(&engine, &sink);

    if args.verify {
        owner.business_verification = VerificationStatus::Verified;
        store.put_owner(owner);
        engine.events.dispatch(TrustEvent::VerificationApproved {
            owner_id: owner_id.clone(),
        });
    }

    let metrics = engine.scoring.get_metrics(&owner_id)?;
    let Some(metrics) = metrics else {
        println!("  No trust metrics were computed");
        return Ok(());
    };

    if args.json {
        let payload = json!({ "metrics": metrics, "invitations": report });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("\nOwner {}", metrics.owner_id);
    println!("  Trust score: {}/100", metrics.trust_score);
    println!(
        "  Responses: {}/{} leads ({:.1}%)",
        metrics.responded_leads, metrics.total_leads, metrics.response_rate
    );
    if let Some(hours) = metrics.avg_response_time_hours {
        println!("  Average response time: {hours:.2}h");
    }
    if let Some(average) = metrics.average_rating {
        println!(
            "  Reviews: {} at {average:.2} stars",
            metrics.total_reviews
        );
    }
    if let Some(quality) = metrics.avg_quality_score {
        println!(
            "  Listings: {} active, quality {quality:.1}",
            metrics.active_listings
        );
    }
    let badges: Vec<&str> = metrics.badges.iter().map(|badge| badge.label()).collect();
    println!(
        "  Badges: {}",
        if badges.is_empty() {
            "none".to_string()
        } else {
            badges.join(", ")
        }
    );

    Ok(())
}

fn drain(engine: &DemoEngine, sink: &BufferedSink) {
    for event in sink.drain() {
        engine.events.dispatch(event);
    }
}

fn demo_listings(owner_id: &UserId) -> Vec<Listing> {
    let mut specifications = BTreeMap::new();
    for (key, value) in [
        ("make", json!("Caterpillar")),
        ("model", json!("320 GC")),
        ("year", json!(2020)),
        ("operating_weight_kg", json!(22_500)),
        ("bucket_capacity_m3", json!(1.19)),
    ] {
        specifications.insert(key.to_string(), value);
    }

    vec![
        Listing {
            id: ListingId::new("lst-excavator"),
            owner_id: owner_id.clone(),
            image_count: 6,
            description: "Well maintained 22 tonne excavator with quick coupler, \
                          general purpose bucket and full service history. Operator available \
                          on request for long-term hire across the Eastern Province."
                .to_string(),
            description_secondary: None,
            specifications,
            status: ListingStatus::Active,
        },
        Listing {
            id: ListingId::new("lst-loader"),
            owner_id: owner_id.clone(),
            image_count: 2,
            description: "Skid steer loader, daily or weekly rental.".to_string(),
            description_secondary: None,
            specifications: BTreeMap::new(),
            status: ListingStatus::Active,
        },
    ]
}

fn demo_phone(index: u32) -> String {
    format!("+966 55 100 {index:04}")
}

fn demo_lead(owner_id: &UserId, index: u32, created_at: chrono::DateTime<Utc>) -> Lead {
    let listing = if index % 2 == 0 {
        "lst-excavator"
    } else {
        "lst-loader"
    };
    Lead {
        id: LeadId::new(format!("lead-{index:03}")),
        listing_id: ListingId::new(listing),
        owner_id: owner_id.clone(),
        created_at,
        status: LeadStatus::New,
        contact: ContactInfo {
            phone: Some(demo_phone(index)),
            email: None,
        },
        owner_responded_at: None,
    }
}
