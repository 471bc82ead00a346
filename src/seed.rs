use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::api::FeedbackApi;

#[derive(Debug, Serialize)]
struct NewAgent<'a> {
    name: &'a str,
    brokerage: &'a str,
}

#[derive(Debug, Serialize)]
struct NewClient<'a> {
    name: &'a str,
    phone: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct NewCall<'a> {
    client_id: i64,
    agent_id: i64,
    twilio_sid: &'a str,
    transcript: &'a str,
}

#[derive(Debug, Serialize)]
struct NewFeedback<'a> {
    client_id: i64,
    agent_id: i64,
    call_id: i64,
    sentiment: &'a str,
    rating: f64,
    summary: &'a str,
    action_items: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: i64,
}

struct DemoFeedback {
    client: usize,
    agent: usize,
    call_sid: &'static str,
    transcript: &'static str,
    sentiment: &'static str,
    rating: f64,
    summary: &'static str,
    action_items: &'static [&'static str],
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub agents: usize,
    pub clients: usize,
    pub calls: usize,
    pub feedbacks: usize,
}

const AGENTS: &[(&str, &str)] = &[
    ("Sarah Johnson", "Premier Realty"),
    ("Michael Chen", "Luxury Homes Group"),
];

const CLIENTS: &[(&str, &str, &str)] = &[
    ("Emily Rodriguez", "+14155551234", "emily.r@email.com"),
    ("David Thompson", "+14155555678", "david.t@email.com"),
    ("Jennifer Park", "+14155559012", "jennifer.p@email.com"),
    ("Robert Martinez", "+14155553456", "robert.m@email.com"),
];

const FEEDBACK: &[DemoFeedback] = &[
    DemoFeedback {
        client: 0,
        agent: 0,
        call_sid: "CA_demo_1",
        transcript: "The agent was amazing! Very professional and responsive.",
        sentiment: "Positive",
        rating: 9.5,
        summary: "Client praised agent for exceptional professionalism and responsiveness throughout the entire home buying process.",
        action_items: &[
            "Continue maintaining high level of communication",
            "Share success story as testimonial",
        ],
    },
    DemoFeedback {
        client: 1,
        agent: 0,
        call_sid: "CA_demo_2",
        transcript: "Good service overall, but could have been more proactive.",
        sentiment: "Neutral",
        rating: 7.0,
        summary: "Client satisfied with service but suggested more proactive updates during the transaction process.",
        action_items: &[
            "Implement weekly status update calls",
            "Set up automated milestone notifications",
        ],
    },
    DemoFeedback {
        client: 2,
        agent: 1,
        call_sid: "CA_demo_3",
        transcript: "Excellent experience! Made the whole process smooth and stress-free.",
        sentiment: "Positive",
        rating: 10.0,
        summary: "Outstanding experience with agent who made the complex process feel effortless and manageable.",
        action_items: &["Request referral", "Feature in marketing materials"],
    },
    DemoFeedback {
        client: 3,
        agent: 1,
        call_sid: "CA_demo_4",
        transcript: "Agent was knowledgeable but communication could be better.",
        sentiment: "Neutral",
        rating: 6.5,
        summary: "Agent demonstrated strong market knowledge but response times to inquiries could be improved.",
        action_items: &["Review communication protocols", "Consider adding support staff"],
    },
];

/// Creates demo agents, clients, calls and feedback through the backend's
/// write endpoints. Stops at the first failed request.
pub async fn seed(api: &FeedbackApi) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    let mut agent_ids = Vec::with_capacity(AGENTS.len());
    for (name, brokerage) in AGENTS {
        let created: Created = api
            .post_json("agents/", &NewAgent { name, brokerage })
            .await
            .with_context(|| format!("failed to create agent {name}"))?;
        tracing::info!(agent_id = created.id, %name, "created agent");
        agent_ids.push(created.id);
        summary.agents += 1;
    }

    let mut client_ids = Vec::with_capacity(CLIENTS.len());
    for (name, phone, email) in CLIENTS {
        let created: Created = api
            .post_json("clients/", &NewClient { name, phone, email })
            .await
            .with_context(|| format!("failed to create client {name}"))?;
        tracing::info!(client_id = created.id, %name, "created client");
        client_ids.push(created.id);
        summary.clients += 1;
    }

    for demo in FEEDBACK {
        let client_id = client_ids[demo.client];
        let agent_id = agent_ids[demo.agent];

        let call: Created = api
            .post_json(
                "calls/",
                &NewCall {
                    client_id,
                    agent_id,
                    twilio_sid: demo.call_sid,
                    transcript: demo.transcript,
                },
            )
            .await
            .with_context(|| format!("failed to create call {}", demo.call_sid))?;
        summary.calls += 1;

        let _: Created = api
            .post_json(
                "feedbacks/",
                &NewFeedback {
                    client_id,
                    agent_id,
                    call_id: call.id,
                    sentiment: demo.sentiment,
                    rating: demo.rating,
                    summary: demo.summary,
                    action_items: serde_json::to_string(demo.action_items)?,
                },
            )
            .await
            .with_context(|| format!("failed to create feedback for call {}", demo.call_sid))?;
        summary.feedbacks += 1;
    }

    Ok(summary)
}
