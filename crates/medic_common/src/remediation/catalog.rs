//! Built-in network remediation actions, grouped by the issue that triggers them

use super::{ActionGroup, RemediationAction, Trigger};
use crate::command_exec::CommandSpec;
use crate::platform::PlatformId::{Linux, Macos, Windows};

fn cmd<const N: usize>(argv: [&str; N]) -> CommandSpec {
    CommandSpec::new(argv)
}

const SET_GOOGLE_DNS_PS: &str = "Get-NetAdapter | Where-Object {$_.Status -eq \"Up\"} | ForEach-Object {Set-DnsClientServerAddress -InterfaceAlias $_.Name -ServerAddresses @(\"8.8.8.8\", \"8.8.4.4\")}";
const DISABLE_ADAPTER_PS: &str = "Get-NetAdapter | Where-Object {$_.Status -eq \"Up\"} | Select-Object -First 1 | Disable-NetAdapter -Confirm:$false";
const ENABLE_ADAPTER_PS: &str = "Get-NetAdapter | Where-Object {$_.Status -eq \"Disabled\"} | Select-Object -First 1 | Enable-NetAdapter -Confirm:$false";

pub fn dns_fixes() -> ActionGroup {
    ActionGroup::new(
        Trigger::DnsFailures,
        vec![
            RemediationAction::new("flush_dns_cache", "Flush DNS cache", 1)
                .with_admin()
                .on(Windows, vec![cmd(["ipconfig", "/flushdns"])])
                .on(Linux, vec![cmd(["sudo", "systemctl", "restart", "systemd-resolved"])])
                .on(Macos, vec![cmd(["sudo", "dscacheutil", "-flushcache"])]),
            RemediationAction::new(
                "reset_dns_servers",
                "Reset DNS servers to Google DNS (8.8.8.8, 8.8.4.4)",
                2,
            )
            .with_admin()
            .on(Windows, vec![cmd(["powershell", "-Command", SET_GOOGLE_DNS_PS])])
            .on(
                Linux,
                vec![
                    cmd(["sudo", "sh", "-c", "echo \"nameserver 8.8.8.8\" > /etc/resolv.conf"]),
                    cmd(["sudo", "sh", "-c", "echo \"nameserver 8.8.4.4\" >> /etc/resolv.conf"]),
                ],
            )
            .on(
                Macos,
                vec![cmd(["networksetup", "-setdnsservers", "Wi-Fi", "8.8.8.8", "8.8.4.4"])],
            ),
            RemediationAction::new("restart_dns_service", "Restart DNS service", 3)
                .with_admin()
                .on(
                    Windows,
                    vec![
                        cmd(["net", "stop", "dnscache"]),
                        cmd(["timeout", "2"]),
                        cmd(["net", "start", "dnscache"]),
                    ],
                )
                .on(Linux, vec![cmd(["sudo", "systemctl", "restart", "systemd-resolved"])])
                .on(Macos, vec![cmd(["sudo", "killall", "-HUP", "mDNSResponder"])]),
        ],
    )
}

pub fn connectivity_fixes() -> ActionGroup {
    ActionGroup::new(
        Trigger::PingFailures,
        vec![
            RemediationAction::new("release_renew_ip", "Release and renew IP address", 1)
                .with_admin()
                .on(
                    Windows,
                    vec![
                        cmd(["ipconfig", "/release"]),
                        cmd(["timeout", "3"]),
                        cmd(["ipconfig", "/renew"]),
                    ],
                )
                .on(
                    Linux,
                    vec![cmd(["sudo", "dhclient", "-r"]), cmd(["sudo", "dhclient"])],
                )
                .on(
                    Macos,
                    vec![
                        cmd(["sudo", "ipconfig", "set", "en0", "BOOTP"]),
                        cmd(["sudo", "ipconfig", "set", "en0", "DHCP"]),
                    ],
                ),
            RemediationAction::new(
                "reset_network_adapter",
                "Reset network adapter configuration",
                2,
            )
            .with_admin()
            .on(Windows, vec![cmd(["netsh", "winsock", "reset"])])
            .on(Linux, vec![cmd(["sudo", "systemctl", "restart", "NetworkManager"])])
            .on(
                Macos,
                vec![
                    cmd(["networksetup", "-setairportpower", "en0", "off"]),
                    cmd(["sleep", "5"]),
                    cmd(["networksetup", "-setairportpower", "en0", "on"]),
                ],
            ),
            RemediationAction::new("reset_tcp_ip_stack", "Reset TCP/IP stack", 3)
                .with_admin()
                .on(
                    Windows,
                    vec![
                        cmd(["netsh", "int", "ip", "reset"]),
                        cmd(["netsh", "int", "tcp", "reset"]),
                    ],
                )
                .on(Linux, vec![cmd(["sudo", "systemctl", "restart", "networking"])])
                .on(
                    Macos,
                    vec![
                        cmd(["sudo", "ifconfig", "en0", "down"]),
                        cmd(["sleep", "3"]),
                        cmd(["sudo", "ifconfig", "en0", "up"]),
                    ],
                ),
        ],
    )
}

pub fn interface_fixes() -> ActionGroup {
    ActionGroup::new(
        Trigger::InterfaceError,
        vec![RemediationAction::new(
            "disable_enable_adapter",
            "Disable and re-enable primary network adapter",
            1,
        )
        .with_admin()
        .on(
            Windows,
            vec![
                cmd(["powershell", "-Command", DISABLE_ADAPTER_PS]),
                cmd(["timeout", "5"]),
                cmd(["powershell", "-Command", ENABLE_ADAPTER_PS]),
            ],
        )
        .on(
            Linux,
            vec![
                cmd(["sudo", "ip", "link", "set", "dev", "eth0", "down"]),
                cmd(["sleep", "5"]),
                cmd(["sudo", "ip", "link", "set", "dev", "eth0", "up"]),
            ],
        )
        .on(
            Macos,
            vec![
                cmd(["sudo", "ifconfig", "en0", "down"]),
                cmd(["sleep", "5"]),
                cmd(["sudo", "ifconfig", "en0", "up"]),
            ],
        )],
    )
}

pub fn windows_fixes() -> ActionGroup {
    ActionGroup::new(
        Trigger::WindowsHost,
        vec![
            RemediationAction::new("reset_winsock", "Reset Winsock catalog", 1)
                .with_admin()
                .on(Windows, vec![cmd(["netsh", "winsock", "reset"])]),
            RemediationAction::new(
                "restart_network_services",
                "Restart essential network services",
                2,
            )
            .with_admin()
            .on(
                Windows,
                vec![
                    cmd(["net", "stop", "dnscache"]),
                    cmd(["timeout", "2"]),
                    cmd(["net", "start", "dnscache"]),
                    cmd(["net", "stop", "dhcp"]),
                    cmd(["timeout", "2"]),
                    cmd(["net", "start", "dhcp"]),
                ],
            ),
            RemediationAction::new(
                "reset_firewall",
                "Reset Windows Firewall to defaults (USE WITH CAUTION)",
                3,
            )
            .with_admin()
            .on(Windows, vec![cmd(["netsh", "advfirewall", "reset"])]),
        ],
    )
}

/// Every built-in group, in the order a pass runs them
pub fn all_groups() -> Vec<ActionGroup> {
    vec![
        dns_fixes(),
        connectivity_fixes(),
        interface_fixes(),
        windows_fixes(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformId;
    use crate::remediation::destructive;

    #[test]
    fn test_group_sizes() {
        assert_eq!(dns_fixes().actions.len(), 3);
        assert_eq!(connectivity_fixes().actions.len(), 3);
        assert_eq!(interface_fixes().actions.len(), 1);
        assert_eq!(windows_fixes().actions.len(), 3);
    }

    #[test]
    fn test_every_destructive_operation_is_in_catalog() {
        let names: Vec<String> = all_groups()
            .into_iter()
            .flat_map(|g| g.actions.into_iter().map(|a| a.name))
            .collect();
        for op in destructive::all() {
            assert!(names.iter().any(|n| n == op.name), "{} missing", op.name);
        }
    }

    #[test]
    fn test_windows_group_has_no_unix_commands() {
        for action in windows_fixes().actions {
            assert!(action.commands_for(PlatformId::Linux).is_none());
            assert!(action.commands_for(PlatformId::Windows).is_some());
        }
    }

    #[test]
    fn test_single_commands_are_one_argv() {
        let flush = &dns_fixes().actions[0];
        let linux = flush.commands_for(PlatformId::Linux).unwrap();
        assert_eq!(linux.len(), 1);
        assert_eq!(linux[0].argv, ["sudo", "systemctl", "restart", "systemd-resolved"]);
    }

    #[test]
    fn test_all_actions_require_admin() {
        assert!(all_groups()
            .iter()
            .flat_map(|g| g.actions.iter())
            .all(|a| a.requires_admin));
    }
}
