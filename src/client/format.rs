//! Output formatting for CLI client commands.
//!
//! Design: human-readable tables and status lines on stdout. The
//! snapshot outline is printed last so it can be piped on its own
//! (`piptool client snapshot | tail -n +6`).

use crate::adapter::{AdapterDescriptor, LifecycleHook, Registry};
use crate::ipc::protocol::PageSnapshot;

/// Print the adapter table.
pub fn print_adapters(registry: &Registry) {
    println!(
        "{:<12} {:<28} {:<30} PLACEMENT",
        "ADAPTER", "HOSTNAME", "HOOK"
    );
    println!("{}", "-".repeat(100));
    for adapter in registry.iter() {
        println!(
            "{:<12} {:<28} {:<30} {}",
            adapter.id,
            adapter.hostname_matcher.as_str(),
            format_hook(adapter.lifecycle_hook.as_ref()),
            adapter.placement,
        );
    }
    println!("{} adapters", registry.len());
}

/// Print every field of one adapter.
pub fn print_adapter(adapter: &AdapterDescriptor) {
    println!("Adapter:   {}", adapter.id);
    println!("Hostname:  {}", adapter.hostname_matcher.as_str());
    println!("Hook:      {}", format_hook(adapter.lifecycle_hook.as_ref()));
    println!("Element:   {}", adapter.element_kind.tag());
    println!("Classes:   {}", adapter.button_classes.join(" "));
    println!("Wrapper:   {}", adapter.player_wrapper_selector);
    println!("Video:     {}", adapter.video_selector);
    println!("Placement: {}", adapter.placement);
    match &adapter.observer {
        Some(observer) => println!(
            "Observer:  {} (marker .{})",
            observer.root, observer.marker_class
        ),
        None => println!("Observer:  -"),
    }
}

/// Print which adapter a hostname resolves to.
pub fn print_resolution(hostname: &str, adapter: Option<&AdapterDescriptor>) {
    match adapter {
        Some(adapter) => println!("{hostname} -> {}", adapter.id),
        None => println!("{hostname} -> no adapter (dormant)"),
    }
}

/// Print the toggle state after a command.
pub fn print_toggle(state: &str) {
    match state {
        "armed" => println!("Armed: next click on a video switches its mode"),
        _ => println!("Disarmed"),
    }
}

pub fn print_fire(name: &str, listeners: u32) {
    println!("Fired {name} ({listeners} listeners)");
}

pub fn print_click(selector: &str, default_prevented: bool) {
    let outcome = if default_prevented {
        "handled"
    } else {
        "passed through"
    };
    println!("Clicked {selector} ({outcome})");
}

pub fn print_mount(parent: &str) {
    println!("Mounted under {parent}");
}

/// Print a page snapshot: a summary header, then the element outline.
pub fn print_snapshot(snapshot: &PageSnapshot) {
    println!("Host:      {}", snapshot.hostname);
    println!(
        "Adapter:   {}",
        snapshot.adapter.as_deref().unwrap_or("- (dormant)")
    );
    println!("Armed:     {}", if snapshot.armed { "yes" } else { "no" });
    println!("Controls:  {}", snapshot.controls);
    println!("---");
    for line in &snapshot.outline {
        println!("{line}");
    }
}

/// `trigger -> action`, or `load only` without a hook.
fn format_hook(hook: Option<&LifecycleHook>) -> String {
    match hook {
        Some(hook) => format!("{} -> {}", hook.trigger, hook.action),
        None => "load only".to_string(),
    }
}
