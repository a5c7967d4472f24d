/*!

This is the long-form manual for `commune_scores` and the `communes` program.

## Input formats

All the inputs are delimited text files. The encoding of each file is declared
in the configuration (`utf-8`, `windows-1252`, ...) and never guessed.

### Results files

One line per polling station, round and choice. Only the following columns are
read, all the other ones are ignored:

| column         | content                                         |
|----------------|-------------------------------------------------|
| `tour`         | the round (1 or 2)                              |
| `departement`  | the department code (`01`, `2A`, `ZA`, ...)     |
| `commune_code` | the commune code within the department          |
| `bureau`       | the polling station identifier                  |
| `inscrits`     | the registered voters of the station            |
| `votants`      | the voters who turned out                       |
| `exprimes`     | the valid votes                                 |
| `choix`        | the choice (candidate, party or answer) label   |
| `voix`         | the votes for this choice                       |

Text fields are trimmed. The three statistics of a station are repeated on every
line of the station and must be identical on all of them.

### Geocoding reference

```text
insee;codespostaux;nom
01001;01400;L'Abergement-Clémenciat
13055;13001/13002/13003;Marseille
```

The first column is the insee code: two characters of department followed by
the commune code. The second column holds the postal codes separated by `/`.

## Configuration

`communes` comes with a built-in description of the historical datasets
(2005 referendum, 2007 and 2012 presidential elections, 2012 legislative
elections). A different set of files can be described in JSON:

```text
{
  "geocoding": { "filePath": "data/inseeinfos.csv", "skipRows": 1 },
  "outputPath": "communes.json",
  "datasets": [
    {
      "name": "pres_2012",
      "filePath": "data/pres_2012.csv",
      "encoding": "windows-1252",
      "skipRows": 0,
      "delimiter": ";",
      "columns": ["tour", "departement", "commune_code", "commune_nom", "bureau",
                  "inscrits", "votants", "exprimes", "choix", "voix"],
      "suffix": "PRES_2012",
      "groupings": {
        "first": { "name": "NONISTES_DROITE", "choices": ["LEPE", "DUPO"] },
        "second": { "name": "NONISTES_GAUCHE", "choices": ["MELE", "ARTH", "POUT"] },
        "unionName": "NONISTES"
      }
    }
  ]
}
```

- `encoding` defaults to `utf-8`, `delimiter` to `;` and `skipRows` to 0.
  `skipRows` counts physical lines, blank ones included. Bytes that are not
  valid in the declared encoding stop the run.
- `columns` names every column of the file, in order.
- `groupings` is optional. Every choice it names must exist in the dataset.
- `specialCodes` is optional and replaces the built-in rules for the overseas
  territories (see below).

Relative paths are resolved against the directory of the configuration file.

## Scores

For each commune, the scores are computed on the first round only:

- one column per choice: the votes as a percentage of the registered voters
- with groupings: the sum of the scores of each group, and their union

A commune without registered voters has no score.

## Output

A JSON object keyed by the commune code (department followed by commune code).
Each commune holds its score columns, suffixed by the dataset (`OUI_TCE`,
`LEPE_PRES_2007`, ...) and its postal codes in `listecodespostaux`. All the
numbers are written with two decimals.

```text
{
    "01001": {
        "NON_TCE": 41.67,
        "OUI_TCE": 33.33,
        "listecodespostaux": [
            "01400"
        ]
    }
}
```

## Special codes

The overseas territories use departments starting with `Z` in the results
files. Their postal codes are found by converting them to an insee code:

- an explicit override for some codes (`ZA123` is `97133`)
- otherwise an offset added to the numeric commune code (`ZA` adds 97000,
  `ZM` adds 97100, ...)

The codes of `ZZ` (French people abroad) get the postal codes `["00000"]`.
The codes that cannot be converted, or whose insee code is not in the
reference, get `["NOT_FOUND"]`. The insee codes starting with `98` are not in
the reference: a manual list would be needed for them.

 */
