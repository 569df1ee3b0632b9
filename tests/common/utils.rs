use frame_overlay::frame::frame_model::{FrameId, TabId};
use frame_overlay::message::command::{ContentCommand, PortCommand, StyleMap};
use frame_overlay::overlay::overlay_model::OverlayElement;
use frame_overlay::sim::sim_host::SimHost;

pub fn fixture(name: &str) -> String {
    let base = std::env::current_dir().unwrap();
    let path = base.join("tests").join("fixtures").join(name);

    path.display().to_string()
}

/// Key handed to `element`'s fragment in its most recent init payload.
pub fn port_key(host: &SimHost, tab: TabId, element: OverlayElement) -> Option<String> {
    host.port_commands(tab, element)
        .into_iter()
        .rev()
        .find_map(|command| match command {
            PortCommand::InitAutofillInlineMenuButton { port_key, .. }
            | PortCommand::InitAutofillInlineMenuList { port_key, .. } => Some(port_key.clone()),
            _ => None,
        })
}

/// Most recent full position (not a height-only update) sent to `element`.
pub fn last_position(host: &SimHost, tab: TabId, element: OverlayElement) -> Option<StyleMap> {
    host.port_commands(tab, element)
        .into_iter()
        .rev()
        .find_map(|command| match command {
            PortCommand::UpdateIframePosition { styles } if styles.contains_key("top") => {
                Some(styles.clone())
            }
            _ => None,
        })
}

pub fn count_commands(
    host: &SimHost,
    tab: TabId,
    frame: FrameId,
    pred: impl Fn(&ContentCommand) -> bool,
) -> usize {
    host.commands_to_frame(tab, frame)
        .into_iter()
        .filter(|command| pred(command))
        .count()
}

pub fn styles(pairs: &[(&str, &str)]) -> StyleMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
