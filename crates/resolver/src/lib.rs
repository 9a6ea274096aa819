//! Flowprint Resolver - well-known port to service name lookup
//!
//! Pure, table-driven, best effort. Based on IANA assigned ports and
//! common services, organized by service category for easy maintenance.
//! A miss returns `None` and leaves the record's name empty; it is never
//! an error.

use flowprint_common::{PortResolver, Transport};

/// Resolve a well-known service name for `port`/`transport`.
#[must_use]
pub fn lookup_service(port: u16, transport: Transport) -> Option<&'static str> {
    match transport {
        Transport::TCP => lookup_tcp(port),
        Transport::UDP => lookup_udp(port),
    }
}

fn lookup_tcp(port: u16) -> Option<&'static str> {
    let service = match port {
        // File Transfer Protocol
        20 => "ftp-data",
        21 => "ftp",
        990 => "ftps",

        // Secure Shell
        22 => "ssh",

        // Telnet
        23 => "telnet",

        // Simple Mail Transfer Protocol
        25 => "smtp",
        465 => "smtps",
        587 => "submission",

        // Domain Name System (zone transfers)
        53 => "domain",

        // Hypertext Transfer Protocol
        80 => "http",
        443 => "https",
        8000 | 8888 | 9000 | 3000 | 5000 => "http-alt",
        8080 => "http-proxy",
        8443 => "https-alt",

        // Post Office Protocol
        109 => "pop2",
        110 => "pop3",
        995 => "pop3s",

        // Internet Message Access Protocol
        143 => "imap",
        220 => "imap3",
        993 => "imaps",

        // Remote Procedure Call / Microsoft services
        111 => "rpcbind",
        135 => "msrpc",
        139 => "netbios-ssn",
        445 => "microsoft-ds",
        3389 => "rdp",
        5985 => "wsman",
        5986 => "wsmans",

        // Directory services
        389 => "ldap",
        636 => "ldaps",
        88 => "kerberos",

        // News / chat
        119 => "nntp",
        194 | 6667 => "irc",
        6697 => "ircs",

        // Border Gateway Protocol
        179 => "bgp",

        // Finger
        79 => "finger",

        // Git
        9418 => "git",

        // Remote sync
        873 => "rsync",

        // Network File System
        2049 => "nfs",

        // Proxies
        1080 => "socks",
        3128 => "squid-http",

        // Databases
        1433 => "mssql",
        1521 => "oracle",
        3306 => "mysql",
        5432 => "postgresql",
        27017 => "mongodb",
        6379 => "redis",
        9200 => "elasticsearch",
        11211 => "memcached",

        // Virtual Network Computing
        5900 => "vnc",
        5901 => "vnc-1",
        5902 => "vnc-2",

        // VPN / tunneling
        1723 => "pptp",
        1194 => "openvpn",

        // Container & orchestration
        2375 => "docker",
        2376 => "docker-tls",
        6443 => "kubernetes",
        10250 => "kubelet",

        // Message queues
        5672 => "amqp",
        15672 => "rabbitmq",
        1883 => "mqtt",
        8883 => "mqtts",

        // Monitoring
        9090 => "prometheus",

        _ => return None,
    };

    Some(service)
}

fn lookup_udp(port: u16) -> Option<&'static str> {
    let service = match port {
        53 => "domain",
        67 => "dhcps",
        68 => "dhcpc",
        69 => "tftp",
        123 => "ntp",
        137 => "netbios-ns",
        138 => "netbios-dgm",
        161 => "snmp",
        162 => "snmptrap",
        500 => "isakmp",
        514 => "syslog",
        520 => "rip",
        1194 => "openvpn",
        1900 => "upnp",
        4500 => "ipsec-nat-t",
        5353 => "mdns",
        _ => return None,
    };

    Some(service)
}

/// Trait-object friendly wrapper around the static table.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellKnownPorts;

impl PortResolver for WellKnownPorts {
    fn lookup(&self, port: u16, transport: Transport) -> Option<&str> {
        lookup_service(port, transport)
    }
}
