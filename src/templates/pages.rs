use std::fmt::Write;

use super::{encode_query, escape, layout};

/// Number of services shown until the visitor asks for all of them.
pub const COLLAPSED_SERVICES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Service {
    pub title: &'static str,
    pub description: &'static str,
}

pub const SERVICES: [Service; 5] = [
    Service {
        title: "Seed Drills Retrofit for Fertilizer Application",
        description: "We provide retrofitting services for seed drills to enable the application \
            of nitrogen fertilizers (CAS) directly during planting. Our solutions increase the \
            efficiency and productivity of agricultural equipment.",
    },
    Service {
        title: "Custom Machinery Modifications",
        description: "We offer customized machinery modifications to optimize the performance of \
            your equipment, adapting it to the specific needs of your agricultural operations.",
    },
    Service {
        title: "Installation of Fertilizer Equipment",
        description: "We install state-of-the-art fertilizer application systems, ensuring \
            accurate and efficient application of liquid and granular fertilizers to improve \
            crop yield.",
    },
    Service {
        title: "Machine Overhaul and Repair",
        description: "We specialize in the overhaul and repair of seed drills and other \
            agricultural machinery, restoring them to peak performance.",
    },
    Service {
        title: "Consulting on Agricultural Machinery",
        description: "We offer expert consulting on selecting, operating, and maintaining \
            agricultural machinery for optimal performance and cost-efficiency.",
    },
];

/// Result of filtering the catalogue for the services page.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceListing {
    pub shown: Vec<Service>,
    /// How many services matched the query.
    pub matched: usize,
    /// Size of the whole catalogue.
    pub total: usize,
}

/// Case-insensitive title filter. Without `show_all` only the first
/// [`COLLAPSED_SERVICES`] matches are kept.
pub fn filter_services(query: &str, show_all: bool) -> ServiceListing {
    let needle = query.trim().to_lowercase();
    let matched: Vec<Service> = SERVICES
        .iter()
        .filter(|s| needle.is_empty() || s.title.to_lowercase().contains(&needle))
        .copied()
        .collect();
    let count = matched.len();
    let shown = if show_all {
        matched
    } else {
        matched.into_iter().take(COLLAPSED_SERVICES).collect()
    };
    ServiceListing {
        shown,
        matched: count,
        total: SERVICES.len(),
    }
}

pub fn home() -> String {
    let mut body = String::from(
        "<p>Welcome! Browse the <a href=\"/board/\">classifieds board</a> or learn about our services.</p><ul>",
    );
    for service in SERVICES.iter() {
        let _ = write!(body, "<li>{}</li>", escape(service.title));
    }
    body.push_str("</ul>");
    layout("Home", None, &body)
}

pub fn about() -> String {
    let body = "<p>PrJSC \"BOHUSLAVSKA SILHOSPTEKNIKA\" is the largest manufacturer in Ukraine of \
        sprayers for agriculture and equipment for application of liquid fertilizer.</p>\
        <h2>The range of our products for plant protection includes:</h2>\
        <p>trailed sprayers ODYSSEY, KRONOS, TITAN and ATLANT of 18m, 22m, 24m, 28m, 32m and 36m \
        working width with capacity of 2000, 2500, 3000, 4000 liters plastic tanks</p>\
        <h2>The range of our products for application of liquid fertilizer includes:</h2>\
        <ul><li>injection applicators LFM-3000-8.4 and LFM-5000-12;</li>\
        <li>trailed plant-feeder for fertilizing PP-5000-01, PP-5000-02 and PP-10000-01</li>\
        <li>complete set of equipment for fertilizer applicator EKO-600-5.6 (for KRN-5.6m)</li></ul>\
        <p>We also re-equip cultivators for injection of UAN (nitrogen solutions) and of ammonia water.</p>\
        <p><strong>Our machinery will protect your crop!</strong></p>";
    layout("About us", None, body)
}

pub fn contact() -> String {
    let body = "<ul><li>Contact address: Ukraine, Kyiv, Pryrodna Street, 1</li>\
        <li>Email: abv@boguslav.ua</li><li>Phone: +380 (44) 123-45-67</li>\
        <li>Working hours: Mon-Fri 08:00 - 16:30</li></ul>\
        <p>We are also on social media!</p>";
    layout("Contact Information", None, body)
}

pub fn services(query: &str, show_all: bool, listing: &ServiceListing) -> String {
    let mut body = format!(
        r#"<form method="get" action="/home/services/"><input name="q" placeholder="Search services..." value="{}"> <button type="submit">Search</button></form>"#,
        escape(query)
    );

    if listing.shown.is_empty() {
        body.push_str("<p>No services available</p>");
    }
    for service in &listing.shown {
        let _ = write!(
            body,
            r#"<section class="service"><h2>{}</h2><p>{}</p></section>"#,
            escape(service.title),
            escape(service.description)
        );
    }

    let _ = write!(
        body,
        "<p>Shown {} of {} matching {}. Total: {}</p>",
        listing.shown.len(),
        listing.matched,
        if listing.matched == 1 { "service" } else { "services" },
        listing.total
    );

    let q = encode_query(query);
    if show_all {
        let _ = write!(body, r#"<a href="/home/services/?q={}">Collapse</a>"#, q);
    } else if listing.matched > listing.shown.len() {
        let _ = write!(
            body,
            r#"<a href="/home/services/?q={}&amp;show_all=true">Show all services</a>"#,
            q
        );
    }

    layout("Our Services", None, &body)
}
